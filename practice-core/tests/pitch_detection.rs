//! Detection tests on synthetic frames.

use practice_core::pitch::detect_note;
use practice_core::{AudioFrame, AutocorrelationMethod, DetectorConfig, NoteName, PitchDetector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

const FRAME_LEN: usize = 2048;

fn sine(frequency: f32, sample_rate: u32, amplitude: f32) -> AudioFrame {
    let samples = (0..FRAME_LEN)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
        })
        .collect();
    AudioFrame::new(samples, sample_rate).unwrap()
}

fn detectors() -> Vec<PitchDetector> {
    [AutocorrelationMethod::Direct, AutocorrelationMethod::Fft]
        .into_iter()
        .map(|method| {
            PitchDetector::new(DetectorConfig {
                method,
                ..DetectorConfig::default()
            })
        })
        .collect()
}

#[test]
fn a440_at_44100_is_a4() {
    for detector in detectors() {
        let note = detector.detect_note(&sine(440.0, 44_100, 0.5));
        assert_eq!(note.map(|n| n.to_string()).as_deref(), Some("A4"));
    }
}

#[test]
fn sines_map_to_nearest_note() {
    let cases = [
        (261.63, 44_100, "C4"),
        (880.0, 44_100, "A5"),
        (440.0, 48_000, "A4"),
        (329.63, 48_000, "E4"),
        (196.0, 44_100, "G3"),
        (1000.0, 44_100, "B5"),
    ];
    for detector in detectors() {
        for (frequency, rate, expected) in cases {
            let note = detector.detect_note(&sine(frequency, rate, 0.5));
            assert_eq!(
                note.map(|n| n.to_string()).as_deref(),
                Some(expected),
                "{frequency} Hz at {rate} Hz ({:?})",
                detector.config().method
            );
        }
    }
}

#[test]
fn silent_frame_has_no_note() {
    for detector in detectors() {
        let frame = AudioFrame::new(vec![0.0; FRAME_LEN], 44_100).unwrap();
        assert_eq!(detector.detect_note(&frame), None);
    }
}

#[test]
fn low_amplitude_noise_is_gated() {
    let mut rng = StdRng::seed_from_u64(7);
    let samples: Vec<f32> = (0..FRAME_LEN)
        .map(|_| rng.random_range(-0.002..0.002))
        .collect();
    let frame = AudioFrame::new(samples, 44_100).unwrap();
    for detector in detectors() {
        assert_eq!(detector.detect_note(&frame), None);
    }
}

#[test]
fn detection_is_idempotent() {
    let detector = PitchDetector::default();
    let frame = sine(523.25, 44_100, 0.3);
    let first = detector.detect_note(&frame);
    let second = detector.detect_note(&frame);
    assert_eq!(first, second);
    assert_eq!(first.map(|n| n.to_string()).as_deref(), Some("C5"));
}

// The search starts at floor(44100 / 2000) = 22 samples. A 2000 Hz tone has a
// period of ~22.05 samples, so the scan begins on its first lobe and only
// locks on after the next zero crossing: the tone reads an octave low.
#[test]
fn tone_at_lag_floor_reads_an_octave_low() {
    let note = PitchDetector::default().detect_note(&sine(2000.0, 44_100, 0.5));
    assert_eq!(note.map(|n| n.to_string()).as_deref(), Some("B5"));
}

#[test]
fn tones_above_cutoff_never_report_their_own_pitch() {
    let detector = PitchDetector::default();
    let ceiling = NoteName::from_frequency(44_100.0 / 22.0).unwrap().frequency();
    for frequency in [2500.0, 3000.0, 4000.0] {
        if let Some(note) = detector.detect_note(&sine(frequency, 44_100, 0.5)) {
            assert!(
                note.frequency() <= ceiling + 1.0,
                "{frequency} Hz detected as {note}"
            );
        }
    }
}

#[test]
fn raw_buffer_entry_point() {
    let samples = sine(440.0, 44_100, 0.5).into_samples();
    assert_eq!(
        detect_note(&samples, 44_100).unwrap().map(|n| n.to_string()).as_deref(),
        Some("A4")
    );
    assert!(detect_note(&samples, 0).is_err());
}

#[test]
fn shared_detector_across_threads() {
    let detector = Arc::new(PitchDetector::default());
    let handles: Vec<_> = [261.63_f32, 440.0, 880.0]
        .into_iter()
        .map(|frequency| {
            let detector = Arc::clone(&detector);
            thread::spawn(move || detector.detect_note(&sine(frequency, 44_100, 0.5)))
        })
        .collect();
    let notes: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().to_string())
        .collect();
    assert_eq!(notes, ["C4", "A4", "A5"]);
}
