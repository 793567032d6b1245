//! # Musical Tuning Module
//!
//! Note naming on the twelve-tone equal-tempered scale anchored at A4 = 440 Hz.
//! Detected frequencies are always rounded to the nearest semitone, so a
//! [`NoteName`] never carries a cent offset of its own; the deviation is
//! reported separately by [`calculate_cents_deviation`].
//!
//! ## Features
//! - Frequency to note name quantization (`440.0` -> `A4`)
//! - Note name to equal-tempered frequency
//! - Parsing of note names with sharps, flats and negative octaves
//! - Cent deviation calculations

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// Frequency of C0, 4.75 octaves (57 semitones) below A4.
static C0_FREQUENCY: Lazy<f32> = Lazy::new(|| A4_FREQUENCY * 2.0_f32.powf(-4.75));

/// Pitch class names in semitone order, starting at C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the twelve semitone names, independent of octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending semitone order.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitones above C (0..12).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class for a semitone index; wraps around for indices >= 12.
    pub fn from_index(index: usize) -> PitchClass {
        Self::ALL[index % 12]
    }

    pub fn as_str(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced when parsing a note name such as `"C#4"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteParseError {
    #[error("note name is empty")]
    Empty,
    #[error("unknown pitch class in `{0}`")]
    UnknownPitchClass(String),
    #[error("missing or invalid octave in `{0}`")]
    InvalidOctave(String),
}

/// A pitch class plus an octave number, e.g. `C4` (middle C) or `A#3`.
///
/// The octave changes at C, so `B3` is immediately followed by `C4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteName {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl NoteName {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Self { pitch_class, octave }
    }

    /// Builds a note from its signed semitone distance above C0.
    ///
    /// Euclidean division keeps the pitch class index in `0..12` for notes
    /// below C0, so `-1` is `B-1` rather than an invalid index.
    pub fn from_half_steps(half_steps: i32) -> Self {
        let octave = half_steps.div_euclid(12);
        let index = half_steps.rem_euclid(12) as usize;
        Self::new(PitchClass::from_index(index), octave)
    }

    /// Quantizes a frequency to the nearest equal-tempered note.
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz
    ///
    /// # Returns
    /// * `Some(note)` - Nearest note (within half a semitone)
    /// * `None` - Frequency is zero, negative, or not finite
    pub fn from_frequency(frequency: f32) -> Option<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let half_steps = (12.0 * (frequency / *C0_FREQUENCY).log2()).round();
        if !half_steps.is_finite() {
            return None;
        }
        Some(Self::from_half_steps(half_steps as i32))
    }

    /// Signed semitone distance above C0.
    ///
    /// Widened to `i64` so every `i32` octave is representable.
    pub fn half_steps(&self) -> i64 {
        i64::from(self.octave) * 12 + self.pitch_class.index() as i64
    }

    /// Equal-tempered frequency of this note in Hz.
    pub fn frequency(&self) -> f32 {
        *C0_FREQUENCY * 2.0_f32.powf(self.half_steps() as f32 / 12.0)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for NoteName {
    type Err = NoteParseError;

    /// Parses `"C4"`, `"F#3"`, `"Bb2"` or `"A-1"`. Flats are folded onto the
    /// enharmonic sharp, so `"Db4"` parses as `C#4` and `"Cb4"` as `B3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(NoteParseError::Empty)?;
        let natural: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteParseError::UnknownPitchClass(s.to_string())),
        };

        let rest = &s[letter.len_utf8()..];
        let (accidental, octave_str) = if let Some(r) = rest.strip_prefix(['#', '♯']) {
            (1, r)
        } else if let Some(r) = rest.strip_prefix(['b', '♭']) {
            (-1, r)
        } else {
            (0, rest)
        };

        let octave: i32 = octave_str
            .parse()
            .map_err(|_| NoteParseError::InvalidOctave(s.to_string()))?;

        let half_steps = octave
            .checked_mul(12)
            .and_then(|h| h.checked_add(natural + accidental))
            .ok_or_else(|| NoteParseError::InvalidOctave(s.to_string()))?;

        Ok(Self::from_half_steps(half_steps))
    }
}

impl TryFrom<String> for NoteName {
    type Error = NoteParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteName> for String {
    fn from(note: NoteName) -> Self {
        note.to_string()
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
