use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

use super::buffer::WaveformBuffer;
use super::spectrogram::SpectrogramResult;
use crate::config::{AnalysisConfig, WindowKind};
use crate::error::{CoreError, Result};

/// Compute the spectrogram of `buffer` with the framing in `config`.
///
/// Channels are averaged into one signal and integer samples are upcast to
/// f64 unscaled. Each window has its mean removed before tapering; energy is
/// one-sided power spectral density, `|X|^2 / (fs * sum(w^2))`, doubled for
/// every bin except DC and Nyquist.
pub fn analyze(buffer: &WaveformBuffer, config: &AnalysisConfig) -> Result<SpectrogramResult> {
    if buffer.is_empty() {
        return Err(CoreError::EmptySignal);
    }
    config.validate()?;

    let signal = buffer.mono_f64();
    let sr = buffer.sample_rate() as f64;
    let size = config.window_length;
    let hop = config.hop();
    let segments = segment_count(signal.len(), size, hop);

    let window = window_coefficients(config.window, size, config.tukey_alpha);
    let scale = 1.0 / (sr * window.iter().map(|w| w * w).sum::<f64>());
    let bins = size / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);

    let columns: Vec<Vec<f64>> = (0..segments)
        .into_par_iter()
        .map(|seg| {
            let start = seg * hop;
            let end = (start + size).min(signal.len());

            // Short signals are zero-padded up to one full window
            let mut frame = vec![0.0f64; size];
            frame[..end - start].copy_from_slice(&signal[start..end]);
            let mean = frame.iter().sum::<f64>() / size as f64;

            let mut fft_input: Vec<Complex<f64>> = frame
                .iter()
                .zip(window.iter())
                .map(|(&s, &w)| Complex::new((s - mean) * w, 0.0))
                .collect();
            fft.process(&mut fft_input);

            fft_input[..bins]
                .iter()
                .enumerate()
                .map(|(k, c)| {
                    let power = c.norm_sqr() * scale;
                    let is_nyquist = size % 2 == 0 && k == size / 2;
                    if k == 0 || is_nyquist {
                        power
                    } else {
                        power * 2.0
                    }
                })
                .collect()
        })
        .collect();

    let frequencies = (0..bins).map(|k| k as f64 * sr / size as f64).collect();
    let time_steps = (0..segments)
        .map(|seg| (seg * hop) as f64 / sr + size as f64 / 2.0 / sr)
        .collect();

    log::info!(
        "Spectrogram: {} bins x {} steps (window={}, hop={}, {:?})",
        bins,
        segments,
        size,
        hop,
        config.window
    );

    Ok(SpectrogramResult::from_columns(frequencies, time_steps, columns))
}

/// Number of analysis windows for `len` samples. Never zero for a non-empty signal.
pub fn segment_count(len: usize, size: usize, hop: usize) -> usize {
    if len <= size {
        1
    } else {
        1 + (len - size) / hop
    }
}

/// Periodic (DFT-even) window of `size` points
pub fn window_coefficients(kind: WindowKind, size: usize, alpha: f64) -> Vec<f64> {
    match kind {
        WindowKind::Rectangular => vec![1.0; size],
        WindowKind::Hann => (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
            .collect(),
        WindowKind::Tukey => (0..size).map(|i| tukey(i as f64 / size as f64, alpha)).collect(),
    }
}

/// Tukey taper at normalized position `x` in [0, 1]
fn tukey(x: f64, alpha: f64) -> f64 {
    if alpha <= 0.0 {
        return 1.0;
    }
    let edge = alpha / 2.0;
    if x < edge {
        0.5 * (1.0 + (PI * (x / edge - 1.0)).cos())
    } else if x > 1.0 - edge {
        0.5 * (1.0 + (PI * ((x - 1.0) / edge + 1.0)).cos())
    } else {
        1.0
    }
}
