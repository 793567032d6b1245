//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! The input callback down-mixes whatever the device delivers to mono, cuts it
//! into fixed-size frames and hands them to the detection loop through a
//! crossbeam channel.
//!
//! ## Features
//! - Default input device selection
//! - Supported config closest to the target sample rate, mono preferred
//! - Down-mixing of multi-channel input
//! - Non-blocking frame hand-off (frames are dropped if the consumer lags)

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Default number of samples per analysis frame (~46 ms at 44.1 kHz).
pub const BUFFER_SIZE: usize = 2048;

/// Default capture sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Collects interleaved callback data into mono frames of a fixed size.
#[derive(Debug)]
pub struct FrameAccumulator {
    channels: usize,
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameAccumulator {
    /// # Arguments
    /// * `channels` - Interleaved channel count of the incoming data (0 is treated as 1)
    /// * `frame_size` - Samples per emitted mono frame (0 is treated as 1)
    pub fn new(channels: usize, frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            channels: channels.max(1),
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Appends interleaved samples and calls `emit` once per completed frame.
    ///
    /// A trailing partial group of channels is ignored.
    pub fn push_interleaved(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        if self.channels == 1 {
            self.pending.extend_from_slice(data);
        } else {
            let scale = 1.0 / self.channels as f32;
            self.pending.extend(
                data.chunks_exact(self.channels)
                    .map(|group| group.iter().sum::<f32>() * scale),
            );
        }

        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            emit(frame);
        }
    }

    /// Number of mono samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `target_rate` - Preferred sample rate in Hz
/// * `frame_size` - Samples per frame sent on `sender`
/// * `sender` - Channel receiving mono frames
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Playing stream handle and the actual sample rate
/// * `Err(e)` - No input device or no usable f32 format
///
/// The stream stops when the returned handle is dropped.
pub fn start_audio_capture(
    target_rate: u32,
    frame_size: usize,
    sender: Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    log::info!("[AUDIO] Selected {} Hz, {} channel(s)", sample_rate, channels);

    let mut accumulator = FrameAccumulator::new(channels, frame_size);
    let err_fn = |err| log::error!("[AUDIO] Stream error: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            accumulator.push_interleaved(data, |frame| {
                // Dropping a frame is fine; the next one follows within ~50ms.
                let _ = sender.try_send(frame);
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input configuration that best matches the target rate.
///
/// Mono configurations win over multi-channel ones; among equals, the one
/// whose rate range is closest to `target_rate` is chosen (zero if the range
/// contains it).
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32 && c.channels() > 0)
        .min_by_key(|c| {
            let distance = rate_distance(c.min_sample_rate().0, c.max_sample_rate().0, target_rate);
            (c.channels() != 1, distance)
        })
}

fn rate_distance(min: u32, max: u32, target: u32) -> u32 {
    if target < min {
        min - target
    } else if target > max {
        target - max
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_input_is_framed_in_order() {
        let mut acc = FrameAccumulator::new(1, 4);
        let mut frames = Vec::new();
        acc.push_interleaved(&[1.0, 2.0, 3.0], |f| frames.push(f));
        assert!(frames.is_empty());
        assert_eq!(acc.pending(), 3);

        acc.push_interleaved(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |f| frames.push(f));
        assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]);
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn stereo_input_is_downmixed() {
        let mut acc = FrameAccumulator::new(2, 2);
        let mut frames = Vec::new();
        acc.push_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], |f| frames.push(f));
        assert_eq!(frames, vec![vec![0.5, 0.5]]);
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn degenerate_sizes_are_clamped() {
        let mut acc = FrameAccumulator::new(0, 0);
        let mut count = 0;
        acc.push_interleaved(&[0.1, 0.2, 0.3], |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn rate_distance_is_zero_inside_range() {
        assert_eq!(rate_distance(8_000, 96_000, 44_100), 0);
        assert_eq!(rate_distance(48_000, 48_000, 44_100), 3_900);
        assert_eq!(rate_distance(8_000, 22_050, 44_100), 22_050);
    }
}
