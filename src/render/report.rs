use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use wavescope::audio::spectrogram::SpectrogramResult;
use wavescope::session::Session;

/// The three display panels, ready for a plotting front end.
#[derive(Serialize)]
pub struct VisualizationReport<'a> {
    pub source: Option<&'a str>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: String,
    pub duration: f64,
    /// Frequency-energy profile (line plot)
    pub frequencies: &'a [f64],
    pub frequency_profile: &'a [f64],
    /// Time-energy profile (line plot)
    pub time_steps: &'a [f64],
    pub temporal_profile: &'a [f64],
    /// Heat map clamped at `clip_multiple` times the mean energy
    pub clip_multiple: f64,
    pub clip_ceiling: f64,
    pub heatmap: Vec<Vec<f64>>,
}

impl<'a> VisualizationReport<'a> {
    pub fn new(session: &'a Session, spectrogram: &'a SpectrogramResult, clip_multiple: f64) -> Self {
        let buffer = session.buffer();
        Self {
            source: session.source_file_name(),
            sample_rate: buffer.sample_rate(),
            channels: buffer.channels(),
            sample_format: buffer.sample_format().to_string(),
            duration: buffer.duration(),
            frequencies: &spectrogram.frequencies,
            frequency_profile: &spectrogram.frequency_profile,
            time_steps: &spectrogram.time_steps,
            temporal_profile: &spectrogram.temporal_profile,
            clip_multiple,
            clip_ceiling: spectrogram.clip_ceiling(clip_multiple),
            heatmap: spectrogram.clipped(clip_multiple),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .context("Failed to serialize visualization report")?;
        log::info!("Wrote visualization report to {}", path.display());
        Ok(())
    }
}

/// One-line summary of where the energy sits, for the terminal
pub fn summarize(spectrogram: &SpectrogramResult) -> String {
    let peak = spectrogram
        .frequency_profile
        .iter()
        .enumerate()
        .fold((0usize, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    let loudest = spectrogram
        .temporal_profile
        .iter()
        .enumerate()
        .fold((0usize, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });

    format!(
        "{} bins x {} steps, peak frequency {:.1} Hz, loudest at {:.2}s, mean energy {:.4e}",
        spectrogram.frequency_bins(),
        spectrogram.time_step_count(),
        spectrogram.frequencies.get(peak.0).copied().unwrap_or(0.0),
        spectrogram.time_steps.get(loudest.0).copied().unwrap_or(0.0),
        spectrogram.mean()
    )
}
