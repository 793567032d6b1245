//! # Audio Frame Module
//!
//! A validated window of mono samples paired with its sample rate. Frames are
//! produced once per analysis tick by the capture side and consumed by the
//! pitch detector.

use thiserror::Error;

/// Errors returned when a frame cannot be analysed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// The sample buffer was empty.
    #[error("audio frame is empty")]
    Empty,

    /// The sample rate was zero.
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    /// A sample was NaN or infinite.
    #[error("audio frame contains a non-finite sample at index {index}")]
    NonFinite { index: usize },
}

/// A fixed window of samples in `[-1, 1]` with its sample rate in Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    /// Validates and wraps a sample buffer.
    ///
    /// Any length is accepted; power-of-two windows of 1024 samples or more
    /// give usable frequency resolution.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, FrameError> {
        if samples.is_empty() {
            return Err(FrameError::Empty);
        }
        if sample_rate == 0 {
            return Err(FrameError::InvalidSampleRate(sample_rate));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }
        Ok(Self { samples, sample_rate })
    }

    /// The samples, in capture order.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz; always positive.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; empty frames are rejected by [`AudioFrame::new`].
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean absolute amplitude, used by the silence gate.
    pub fn mean_amplitude(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).sum::<f32>() / self.samples.len() as f32
    }

    /// Root-mean-square amplitude.
    pub fn rms(&self) -> f32 {
        (self.samples.iter().map(|&s| s * s).sum::<f32>() / self.samples.len() as f32).sqrt()
    }

    /// Input level in percent (RMS * 100, clamped to `0..=100`).
    pub fn level(&self) -> f32 {
        (self.rms() * 100.0).clamp(0.0, 100.0)
    }

    /// Consumes the frame, returning its sample buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
