//! # Pitch Detection Module
//!
//! Monophonic pitch detection by time-domain autocorrelation.
//!
//! ## Pipeline
//! 1. Silence gate on the mean absolute amplitude
//! 2. Autocorrelation of the whole frame (direct or FFT)
//! 3. Lag search starting at `sample_rate / max_frequency`
//! 4. First periodicity lobe after the first zero crossing
//! 5. Correlation threshold
//! 6. `sample_rate / lag` quantized to the nearest note name
//!
//! The detector is stateless between calls, so a single instance can be
//! shared across threads and streams.

use serde::{Deserialize, Serialize};

use crate::AnalysisResult;
use crate::fft::{autocorrelate_direct, autocorrelate_fft};
use crate::frame::{AudioFrame, FrameError};
use crate::tuning::{NoteName, calculate_cents_deviation};

/// Mean absolute amplitude below which a frame counts as silence.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.003;
/// Minimum raw autocorrelation value of the selected peak.
pub const DEFAULT_CORRELATION_THRESHOLD: f32 = 0.01;
/// Highest frequency the lag search considers, in Hz.
pub const DEFAULT_MAX_FREQUENCY: f32 = 2000.0;

/// How the autocorrelation is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutocorrelationMethod {
    /// O(n²) sum over the valid overlap of each lag.
    #[default]
    Direct,
    /// Inverse FFT of the power spectrum; same values, better scaling.
    Fft,
}

/// Tunable thresholds of the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub silence_threshold: f32,
    pub correlation_threshold: f32,
    pub max_frequency: f32,
    pub method: AutocorrelationMethod,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            method: AutocorrelationMethod::Direct,
        }
    }
}

/// Autocorrelation pitch detector.
#[derive(Debug, Clone, Default)]
pub struct PitchDetector {
    config: DetectorConfig,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Smallest lag searched for a frame at `sample_rate`.
    pub fn min_lag(&self, sample_rate: u32) -> usize {
        (sample_rate as f32 / self.config.max_frequency).floor() as usize
    }

    /// Estimates the fundamental frequency of a frame.
    ///
    /// # Returns
    /// * `Some(frequency)` - `sample_rate / peak_lag` in Hz
    /// * `None` - Frame is silent or has no confident periodicity
    pub fn estimate_frequency(&self, frame: &AudioFrame) -> Option<f32> {
        if frame.mean_amplitude() < self.config.silence_threshold {
            return None;
        }

        let correlations = match self.config.method {
            AutocorrelationMethod::Direct => autocorrelate_direct(frame.samples()),
            AutocorrelationMethod::Fft => autocorrelate_fft(frame.samples()),
        };

        let (peak_lag, peak_value) =
            find_first_periodicity_peak(&correlations, self.min_lag(frame.sample_rate()))?;

        if peak_value > self.config.correlation_threshold {
            Some(frame.sample_rate() as f32 / peak_lag as f32)
        } else {
            None
        }
    }

    /// Detects the nearest note name of a frame, or `None` if no reliable
    /// pitch was found.
    pub fn detect_note(&self, frame: &AudioFrame) -> Option<NoteName> {
        self.estimate_frequency(frame)
            .and_then(NoteName::from_frequency)
    }

    /// Full analysis of one frame: frequency, note, cent deviation and level.
    pub fn analyze(&self, frame: &AudioFrame) -> AnalysisResult {
        let detected_frequency = self.estimate_frequency(frame);
        let note_name = detected_frequency.and_then(NoteName::from_frequency);
        let cents_deviation = match (detected_frequency, note_name) {
            (Some(freq), Some(note)) => Some(calculate_cents_deviation(freq, note.frequency())),
            _ => None,
        };

        AnalysisResult {
            detected_frequency,
            note_name,
            cents_deviation,
            level: frame.level(),
        }
    }
}

/// Detects a note in a raw sample buffer with the default detector.
///
/// Malformed input (empty buffer, zero sample rate, non-finite samples) is
/// reported as an error; silence and noise yield `Ok(None)`.
pub fn detect_note(samples: &[f32], sample_rate: u32) -> Result<Option<NoteName>, FrameError> {
    let frame = AudioFrame::new(samples.to_vec(), sample_rate)?;
    Ok(PitchDetector::default().detect_note(&frame))
}

/// Scans lags upward from `min_lag` for the first periodicity lobe.
///
/// Nothing counts until the correlation has dropped to zero or below once,
/// which skips the zero-lag peak and its decay. The maximum of the next
/// positive lobe is tracked, and the scan stops as soon as the correlation
/// turns negative again after that lobe has started. Taking the first lobe
/// instead of the global maximum keeps the detector on the fundamental period
/// rather than a multiple of it.
///
/// Returns `(lag, correlation)` of the peak, or `None` if no positive lobe
/// followed the zero crossing.
fn find_first_periodicity_peak(correlations: &[f32], min_lag: usize) -> Option<(usize, f32)> {
    let mut found_zero_crossing = false;
    let mut max_correlation = 0.0_f32;
    let mut max_lag = 0_usize;

    for (lag, &value) in correlations.iter().enumerate().skip(min_lag) {
        if !found_zero_crossing {
            if value <= 0.0 {
                found_zero_crossing = true;
            }
            continue;
        }

        if value > max_correlation {
            max_correlation = value;
            max_lag = lag;
        } else if value < 0.0 && max_lag > 0 {
            break;
        }
    }

    (max_lag > 0).then_some((max_lag, max_correlation))
}
