//! # Configuration Module
//!
//! Settings for the detector, the capture side and the practice loop. Stored
//! as pretty-printed JSON; every field has a default, so a partial file only
//! overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::audio::{BUFFER_SIZE, TARGET_SAMPLE_RATE};
use crate::pitch::DetectorConfig;

/// Errors raised while loading, saving or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value `{name}`: {reason}")]
    Invalid {
        name: &'static str,
        reason: &'static str,
    },
}

/// Complete configuration of a practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Pitch detector thresholds.
    pub detector: DetectorConfig,
    /// Samples per analysis frame.
    pub frame_size: usize,
    /// Preferred capture sample rate in Hz.
    pub target_sample_rate: u32,
    /// Window in which a repeated identical note is suppressed.
    pub debounce_ms: u64,
    /// How long a wrong note stays visible.
    pub incorrect_display_ms: u64,
    /// Input level (percent) a frame must exceed before detection runs.
    pub min_level: f32,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            frame_size: BUFFER_SIZE,
            target_sample_rate: TARGET_SAMPLE_RATE,
            debounce_ms: 200,
            incorrect_display_ms: 500,
            min_level: 1.0,
        }
    }
}

impl PracticeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn incorrect_display(&self) -> Duration {
        Duration::from_millis(self.incorrect_display_ms)
    }

    /// Checks values that would make detection meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::Invalid {
                name: "frame_size",
                reason: "must be positive",
            });
        }
        if self.target_sample_rate == 0 {
            return Err(ConfigError::Invalid {
                name: "target_sample_rate",
                reason: "must be positive",
            });
        }
        if !(self.detector.max_frequency > 0.0) {
            return Err(ConfigError::Invalid {
                name: "detector.max_frequency",
                reason: "must be positive",
            });
        }
        if !(self.detector.silence_threshold >= 0.0) || !(self.detector.correlation_threshold >= 0.0) {
            return Err(ConfigError::Invalid {
                name: "detector",
                reason: "thresholds must be non-negative",
            });
        }
        if !(self.min_level >= 0.0) {
            return Err(ConfigError::Invalid {
                name: "min_level",
                reason: "must be non-negative",
            });
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: PracticeConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::AutocorrelationMethod;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("practice-core-{}-{}", std::process::id(), name))
    }

    #[test]
    fn defaults_match_detector_constants() {
        let config = PracticeConfig::default();
        assert_eq!(config.frame_size, 2048);
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert_eq!(config.incorrect_display(), Duration::from_millis(500));
        assert_eq!(config.detector.silence_threshold, 0.003);
        assert_eq!(config.detector.correlation_threshold, 0.01);
        assert_eq!(config.detector.max_frequency, 2000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PracticeConfig =
            serde_json::from_str(r#"{ "debounce_ms": 120, "detector": { "method": "fft" } }"#)
                .unwrap();
        assert_eq!(config.debounce_ms, 120);
        assert_eq!(config.detector.method, AutocorrelationMethod::Fft);
        assert_eq!(config.detector.max_frequency, 2000.0);
        assert_eq!(config.frame_size, 2048);
    }

    #[test]
    fn validation_rejects_zero_sizes() {
        let config = PracticeConfig {
            frame_size: 0,
            ..PracticeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "frame_size", .. })
        ));

        let mut config = PracticeConfig::default();
        config.detector.max_frequency = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_accepts_zero_but_rejects_negative_thresholds() {
        let mut config = PracticeConfig::default();
        config.detector.silence_threshold = 0.0;
        config.detector.correlation_threshold = 0.0;
        config.min_level = 0.0;
        assert!(config.validate().is_ok());

        config.detector.correlation_threshold = -0.01;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "detector", .. })
        ));

        let config = PracticeConfig {
            min_level: f32::NAN,
            ..PracticeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("config.json");
        let config = PracticeConfig {
            min_level: 2.5,
            ..PracticeConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = PracticeConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_reports_missing_file_and_bad_json() {
        assert!(matches!(
            PracticeConfig::load(temp_path("does-not-exist.json")),
            Err(ConfigError::Io(_))
        ));

        let path = temp_path("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = PracticeConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }
}
