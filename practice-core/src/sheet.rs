//! Sheet-music recognition.
//!
//! Only a stand-in exists: [`DemoRecognizer`] checks that the photographed
//! page can be read, waits as a real recognizer would, and returns the demo
//! sequence.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::practice::{PracticeNote, demo_sequence};

/// Turns a photographed page of sheet music into a note sequence.
pub trait SheetMusicRecognizer {
    fn recognize(&self, image: &Path) -> Result<Vec<PracticeNote>>;
}

/// Returns [`demo_sequence`] for any readable, non-empty image.
#[derive(Debug, Clone)]
pub struct DemoRecognizer {
    pub delay: Duration,
}

impl Default for DemoRecognizer {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
        }
    }
}

impl SheetMusicRecognizer for DemoRecognizer {
    fn recognize(&self, image: &Path) -> Result<Vec<PracticeNote>> {
        let bytes = std::fs::read(image)
            .with_context(|| format!("reading sheet music image {}", image.display()))?;
        anyhow::ensure!(!bytes.is_empty(), "sheet music image {} is empty", image.display());

        log::info!(
            "[SHEET] Simulating recognition of {} ({} bytes)",
            image.display(),
            bytes.len()
        );
        std::thread::sleep(self.delay);
        Ok(demo_sequence())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_image_yields_demo_sequence() {
        let path = std::env::temp_dir()
            .join(format!("practice-core-{}-sheet.jpg", std::process::id()));
        std::fs::write(&path, [0xFF_u8, 0xD8, 0xFF, 0xE0]).unwrap();
        let recognizer = DemoRecognizer { delay: Duration::ZERO };
        let notes = recognizer.recognize(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(notes, demo_sequence());
    }

    #[test]
    fn missing_or_empty_image_is_an_error() {
        let recognizer = DemoRecognizer { delay: Duration::ZERO };
        let missing = std::env::temp_dir().join("practice-core-no-such-sheet.png");
        assert!(recognizer.recognize(&missing).is_err());

        let empty = std::env::temp_dir()
            .join(format!("practice-core-{}-empty-sheet.png", std::process::id()));
        std::fs::write(&empty, b"").unwrap();
        let result = recognizer.recognize(&empty);
        std::fs::remove_file(&empty).ok();
        assert!(result.is_err());
    }
}
