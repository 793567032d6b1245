//! # Practice Module
//!
//! Compares detected notes against an expected sequence. A correct note is
//! marked as played and the session advances; a wrong note is remembered for
//! a short display window and the session stays where it is.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::tuning::{NoteName, PitchClass};

/// One note of a practice sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeNote {
    pub note: NoteName,
    /// Position on the staff (0 = middle C).
    pub position: i32,
    /// Duration in beats.
    pub duration: f32,
    /// Whether the note has been played correctly.
    #[serde(default)]
    pub played: bool,
}

impl PracticeNote {
    pub fn new(note: NoteName, position: i32, duration: f32) -> Self {
        Self {
            note,
            position,
            duration,
            played: false,
        }
    }
}

/// The C major scale from middle C, one beat per note.
pub fn demo_sequence() -> Vec<PracticeNote> {
    let scale = [
        (PitchClass::C, 4),
        (PitchClass::D, 4),
        (PitchClass::E, 4),
        (PitchClass::F, 4),
        (PitchClass::G, 4),
        (PitchClass::A, 4),
        (PitchClass::B, 4),
        (PitchClass::C, 5),
    ];
    scale
        .iter()
        .enumerate()
        .map(|(i, &(pitch_class, octave))| {
            PracticeNote::new(NoteName::new(pitch_class, octave), i as i32, 1.0)
        })
        .collect()
}

/// Reads a practice sequence from a JSON array of notes.
pub fn load_sequence(path: impl AsRef<Path>) -> Result<Vec<PracticeNote>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading sequence {}", path.display()))?;
    let notes: Vec<PracticeNote> = serde_json::from_str(&data)
        .with_context(|| format!("parsing sequence {}", path.display()))?;
    anyhow::ensure!(!notes.is_empty(), "sequence {} has no notes", path.display());
    Ok(notes)
}

/// Writes a practice sequence as pretty-printed JSON.
pub fn save_sequence(path: impl AsRef<Path>, notes: &[PracticeNote]) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(notes)?;
    std::fs::write(path, json).with_context(|| format!("writing sequence {}", path.display()))?;
    Ok(())
}

/// Outcome of submitting one detected note.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgement {
    /// The expected note at `index` was played.
    Correct { index: usize, note: NoteName },
    /// A different note was played; the session did not advance.
    Incorrect { expected: NoteName, played: NoteName },
    /// The sequence was already finished; nothing changed.
    Complete,
}

/// Progress through a practice sequence.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    notes: Vec<PracticeNote>,
    current: usize,
    incorrect: Option<(NoteName, Instant)>,
    incorrect_display: Duration,
}

impl PracticeSession {
    pub fn new(notes: Vec<PracticeNote>, incorrect_display: Duration) -> Self {
        Self {
            notes,
            current: 0,
            incorrect: None,
            incorrect_display,
        }
    }

    /// Judges a detected note against the expected one.
    pub fn submit(&mut self, detected: &NoteName, now: Instant) -> Judgement {
        let Some(expected) = self.notes.get_mut(self.current) else {
            return Judgement::Complete;
        };

        if expected.note == *detected {
            expected.played = true;
            let index = self.current;
            self.current += 1;
            log::debug!("[PRACTICE] {} correct at {}", detected, index);
            Judgement::Correct {
                index,
                note: *detected,
            }
        } else {
            let expected = expected.note;
            self.incorrect = Some((*detected, now));
            log::debug!("[PRACTICE] expected {}, heard {}", expected, detected);
            Judgement::Incorrect {
                expected,
                played: *detected,
            }
        }
    }

    /// The last wrong note, while it is still inside the display window.
    pub fn incorrect_note(&self, now: Instant) -> Option<NoteName> {
        self.incorrect
            .filter(|(_, at)| now.saturating_duration_since(*at) < self.incorrect_display)
            .map(|(note, _)| note)
    }

    pub fn current_note(&self) -> Option<&PracticeNote> {
        self.notes.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn notes(&self) -> &[PracticeNote] {
        &self.notes
    }

    /// `(played, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.notes.iter().filter(|n| n.played).count(), self.notes.len())
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.notes.len()
    }

    /// Clears every played flag and returns to the first note.
    pub fn reset(&mut self) {
        for note in &mut self.notes {
            note.played = false;
        }
        self.current = 0;
        self.incorrect = None;
    }
}
