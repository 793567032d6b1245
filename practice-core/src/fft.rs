//! # Autocorrelation Module
//!
//! Computes the linear autocorrelation `corr[L] = Σ_i x[i] * x[i + L]` of a
//! frame, either with the direct O(n²) sum or through RustFFT
//! (Wiener-Khinchin: inverse FFT of the power spectrum). Both return one value
//! per lag in `0..n` and agree up to floating point rounding.

use rustfft::{FftPlanner, num_complex::Complex};

/// Direct time-domain autocorrelation over the valid overlap of each lag.
pub fn autocorrelate_direct(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    (0..n)
        .map(|lag| {
            signal[..n - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// FFT-based autocorrelation.
///
/// The signal is zero padded to a power of two of at least `2n` samples so the
/// circular correlation of the transform equals the linear one for every lag
/// below `n`.
pub fn autocorrelate_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let padded_len = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(padded_len);
    let inverse = planner.plan_fft_inverse(padded_len);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(padded_len)
        .collect();

    forward.process(&mut buffer);
    for bin in buffer.iter_mut() {
        *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
    }
    inverse.process(&mut buffer);

    // RustFFT does not normalize the inverse transform.
    let scale = 1.0 / padded_len as f32;
    buffer.iter().take(n).map(|c| c.re * scale).collect()
}
