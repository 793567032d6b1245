//! # Listener Module
//!
//! The polling side of note detection: frames arrive from the capture
//! callback, the detector runs on each one that is loud enough, repeated
//! detections are debounced and the survivors are delivered as events.
//!
//! ## Architecture
//! - **Capture**: CPAL callback on the audio thread, frames over a bounded channel
//! - **Listener thread**: owns the stream and runs [`DetectionLoop`]
//! - **Caller**: receives [`ListenerEvent`]s; [`Listener::stop`] (or drop)
//!   signals shutdown, pauses the stream and joins the thread

use anyhow::{Result, anyhow};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio;
use crate::config::PracticeConfig;
use crate::frame::AudioFrame;
use crate::pitch::PitchDetector;
use crate::tuning::NoteName;

/// Frames buffered between the capture callback and the detection loop.
const FRAME_QUEUE_DEPTH: usize = 8;

/// A note accepted by the debouncer.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub note: NoteName,
    pub frequency: f32,
    pub cents_deviation: f32,
    pub level: f32,
    pub at: Instant,
}

/// Events delivered by the detection loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    /// Input level of a frame, in percent.
    Level(f32),
    /// A detected note that passed the debouncer.
    Note(NoteEvent),
}

/// Suppresses the same note being reported again within a short window.
///
/// A different note is always accepted, as is the same note once the window
/// since its last acceptance has passed.
#[derive(Debug, Clone)]
pub struct NoteDebouncer {
    window: Duration,
    last: Option<(NoteName, Instant)>,
}

impl NoteDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns true (and remembers the note) if `note` should be reported.
    pub fn accept(&mut self, note: NoteName, now: Instant) -> bool {
        let accepted = match self.last {
            Some((last_note, at)) => {
                last_note != note || now.saturating_duration_since(at) > self.window
            }
            None => true,
        };
        if accepted {
            self.last = Some((note, now));
        }
        accepted
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Per-stream detection state: the detector plus the debouncer.
#[derive(Debug)]
pub struct DetectionLoop {
    detector: PitchDetector,
    debouncer: NoteDebouncer,
    sample_rate: u32,
    min_level: f32,
}

impl DetectionLoop {
    pub fn new(detector: PitchDetector, debouncer: NoteDebouncer, sample_rate: u32, min_level: f32) -> Self {
        Self {
            detector,
            debouncer,
            sample_rate,
            min_level,
        }
    }

    /// Processes one frame, returning the events it produced.
    ///
    /// Frames at or below the minimum input level only report their level.
    pub fn process(&mut self, samples: Vec<f32>, now: Instant) -> Vec<ListenerEvent> {
        let frame = match AudioFrame::new(samples, self.sample_rate) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("[LISTENER] Skipping frame: {}", e);
                return Vec::new();
            }
        };

        let level = frame.level();
        let mut events = vec![ListenerEvent::Level(level)];
        if level <= self.min_level {
            return events;
        }

        let result = self.detector.analyze(&frame);
        if let (Some(note), Some(frequency)) = (result.note_name, result.detected_frequency) {
            if self.debouncer.accept(note, now) {
                log::debug!("[LISTENER] Detected {} ({:.1} Hz)", note, frequency);
                events.push(ListenerEvent::Note(NoteEvent {
                    note,
                    frequency,
                    cents_deviation: result.cents_deviation.unwrap_or(0.0),
                    level,
                    at: now,
                }));
            }
        }
        events
    }

    /// Runs until `shutdown` fires or either channel closes.
    ///
    /// Returns the number of frames processed.
    pub fn run(
        &mut self,
        frames: &Receiver<Vec<f32>>,
        shutdown: &Receiver<()>,
        events: &Sender<ListenerEvent>,
    ) -> usize {
        let mut processed = 0;
        loop {
            crossbeam_channel::select! {
                recv(frames) -> msg => match msg {
                    Ok(samples) => {
                        processed += 1;
                        for event in self.process(samples, Instant::now()) {
                            if events.send(event).is_err() {
                                log::info!("[LISTENER] Event receiver dropped");
                                return processed;
                            }
                        }
                    }
                    Err(_) => {
                        log::info!("[LISTENER] Audio channel closed");
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    log::info!("[LISTENER] Received shutdown signal");
                    break;
                },
            }
        }
        processed
    }
}

/// A running microphone listener.
///
/// Holds the capture stream on a dedicated thread for as long as it lives.
#[derive(Debug)]
pub struct Listener {
    shutdown_tx: Sender<()>,
    events: Receiver<ListenerEvent>,
    thread_handle: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl Listener {
    /// Opens the default input device and starts detecting notes.
    ///
    /// Fails if the configuration is invalid or capture cannot be started.
    pub fn start(config: &PracticeConfig) -> Result<Self> {
        config.validate()?;

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, String>>(1);
        let config = config.clone();

        let thread_handle = thread::Builder::new()
            .name("practice-listener".into())
            .spawn(move || {
                let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE_DEPTH);
                let (stream, sample_rate) = match audio::start_audio_capture(
                    config.target_sample_rate,
                    config.frame_size,
                    raw_tx,
                ) {
                    Ok(tuple) => tuple,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{e:#}")));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                let mut detection = DetectionLoop::new(
                    PitchDetector::new(config.detector.clone()),
                    NoteDebouncer::new(config.debounce()),
                    sample_rate,
                    config.min_level,
                );
                let processed = detection.run(&raw_rx, &shutdown_rx, &events_tx);

                log::info!("[LISTENER] Stopping stream after {} frames", processed);
                if let Err(e) = stream.pause() {
                    log::warn!("[LISTENER] Error pausing stream: {}", e);
                }
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => Ok(Self {
                shutdown_tx,
                events: events_rx,
                thread_handle: Some(thread_handle),
                sample_rate,
            }),
            Ok(Err(message)) => {
                let _ = thread_handle.join();
                Err(anyhow!("failed to start audio capture: {message}"))
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(anyhow!("listener thread exited before capture started"))
            }
        }
    }

    pub fn events(&self) -> &Receiver<ListenerEvent> {
        &self.events
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stops capture and waits for the listener thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.shutdown_tx.try_send(());
            if handle.join().is_err() {
                log::error!("[LISTENER] Listener thread panicked");
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> NoteName {
        s.parse().unwrap()
    }

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn detection_loop(window: Duration) -> DetectionLoop {
        DetectionLoop::new(PitchDetector::default(), NoteDebouncer::new(window), 44_100, 1.0)
    }

    #[test]
    fn debouncer_suppresses_repeats_within_window() {
        let mut debouncer = NoteDebouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        assert!(debouncer.accept(note("A4"), t0));
        assert!(!debouncer.accept(note("A4"), t0 + Duration::from_millis(150)));
        assert!(debouncer.accept(note("A4"), t0 + Duration::from_millis(250)));
    }

    #[test]
    fn debouncer_always_accepts_a_new_note() {
        let mut debouncer = NoteDebouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        assert!(debouncer.accept(note("A4"), t0));
        assert!(debouncer.accept(note("B4"), t0 + Duration::from_millis(10)));
        assert!(debouncer.accept(note("A4"), t0 + Duration::from_millis(20)));

        debouncer.reset();
        assert!(debouncer.accept(note("A4"), t0 + Duration::from_millis(30)));
    }

    #[test]
    fn quiet_frames_only_report_level() {
        let mut detection = detection_loop(Duration::from_millis(200));
        let events = detection.process(vec![0.0; 2048], Instant::now());
        assert_eq!(events, vec![ListenerEvent::Level(0.0)]);
    }

    #[test]
    fn malformed_frames_are_skipped() {
        let mut detection = detection_loop(Duration::from_millis(200));
        assert!(detection.process(Vec::new(), Instant::now()).is_empty());
    }

    #[test]
    fn loud_tone_produces_note_event() {
        let mut detection = detection_loop(Duration::from_millis(200));
        let now = Instant::now();
        let events = detection.process(sine(440.0, 44_100, 2048), now);
        assert_eq!(events.len(), 2);
        match &events[1] {
            ListenerEvent::Note(event) => {
                assert_eq!(event.note, note("A4"));
                assert_eq!(event.at, now);
                assert!(event.level > 1.0);
            }
            other => panic!("expected a note event, got {other:?}"),
        }
    }

    #[test]
    fn run_debounces_until_frames_end() {
        let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
        let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        for _ in 0..3 {
            frames_tx.send(sine(440.0, 44_100, 2048)).unwrap();
        }
        frames_tx.send(sine(880.0, 44_100, 2048)).unwrap();
        drop(frames_tx);

        let mut detection = detection_loop(Duration::from_secs(3600));
        let processed = detection.run(&frames_rx, &shutdown_rx, &events_tx);
        assert_eq!(processed, 4);

        let notes: Vec<String> = events_rx
            .try_iter()
            .filter_map(|e| match e {
                ListenerEvent::Note(n) => Some(n.note.to_string()),
                ListenerEvent::Level(_) => None,
            })
            .collect();
        assert_eq!(notes, ["A4", "A5"]);
    }

    #[test]
    fn run_stops_on_shutdown() {
        let (_frames_tx, frames_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        shutdown_tx.send(()).unwrap();

        let mut detection = detection_loop(Duration::from_millis(200));
        assert_eq!(detection.run(&frames_rx, &shutdown_rx, &events_tx), 0);
    }
}
