// practice-core/src/lib.rs

//! The core logic for the sheet-music practice trainer.
//! This crate turns microphone frames into note names, debounces them and
//! checks them against a practice sequence. It is completely headless
//! and contains no UI code.
//!
//! ```no_run
//! use practice_core::pitch::detect_note;
//!
//! let samples: Vec<f32> = (0..2048)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
//!     .collect();
//! let note = detect_note(&samples, 44_100)?;
//! assert_eq!(note.map(|n| n.to_string()).as_deref(), Some("A4"));
//! # Ok::<(), practice_core::frame::FrameError>(())
//! ```

pub mod audio;
pub mod config;
pub mod fft;
pub mod frame;
pub mod listener;
pub mod pitch;
pub mod practice;
pub mod sheet;
pub mod tuning;

pub use config::{ConfigError, PracticeConfig};
pub use frame::{AudioFrame, FrameError};
pub use pitch::{AutocorrelationMethod, DetectorConfig, PitchDetector};
pub use practice::{Judgement, PracticeNote, PracticeSession};
pub use tuning::{NoteName, PitchClass};

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// The detected fundamental frequency in Hz.
    pub detected_frequency: Option<f32>,
    /// The nearest equal-tempered note.
    pub note_name: Option<NoteName>,
    /// The deviation of the frequency from that note, in cents.
    pub cents_deviation: Option<f32>,
    /// Input level in percent.
    pub level: f32,
}
