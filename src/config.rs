use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Short-time Fourier transform framing.
///
/// Defaults: 256-sample windows overlapping by 32 samples (a hop of 224),
/// Tukey window with alpha 0.25. These fix the frequency resolution
/// (`window_length / 2 + 1` bins) and the time step spacing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default = "default_tukey_alpha")]
    pub tukey_alpha: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Tukey,
    Hann,
    Rectangular,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    /// Heat-map colour ceiling as a multiple of the mean spectrogram energy
    #[serde(default = "default_clip_multiple")]
    pub clip_multiple: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackConfig {
    /// Position tracker cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl AnalysisConfig {
    /// Samples between consecutive window starts; never zero, even before `validate`
    pub fn hop(&self) -> usize {
        self.window_length.saturating_sub(self.overlap).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_length < 2 {
            return Err(CoreError::Config(format!(
                "window_length must be at least 2, got {}",
                self.window_length
            )));
        }
        if self.overlap >= self.window_length {
            return Err(CoreError::Config(format!(
                "overlap ({}) must be smaller than window_length ({})",
                self.overlap, self.window_length
            )));
        }
        if !(0.0..=1.0).contains(&self.tukey_alpha) {
            return Err(CoreError::Config(format!(
                "tukey_alpha must lie in [0, 1], got {}",
                self.tukey_alpha
            )));
        }
        Ok(())
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.clip_multiple.is_finite() || self.clip_multiple <= 0.0 {
            return Err(CoreError::Config(format!(
                "clip_multiple must be a positive number, got {}",
                self.clip_multiple
            )));
        }
        Ok(())
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            overlap: default_overlap(),
            window: WindowKind::default(),
            tukey_alpha: default_tukey_alpha(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            clip_multiple: default_clip_multiple(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_window_length() -> usize { 256 }
fn default_overlap() -> usize { 32 }
fn default_tukey_alpha() -> f64 { 0.25 }
fn default_clip_multiple() -> f64 { 10.0 }
fn default_poll_interval_ms() -> u64 { 100 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.analysis, AnalysisConfig::default());
        assert_eq!(cfg.analysis.hop(), 224);
        assert_eq!(cfg.display.clip_multiple, 10.0);
        assert_eq!(cfg.playback.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_sections_override_only_named_keys() {
        let cfg: Config = toml::from_str(
            "[analysis]\nwindow_length = 512\nwindow = \"hann\"\n[playback]\npoll_interval_ms = 40\n",
        )
        .unwrap();
        assert_eq!(cfg.analysis.window_length, 512);
        assert_eq!(cfg.analysis.overlap, 32);
        assert_eq!(cfg.analysis.window, WindowKind::Hann);
        assert_eq!(cfg.playback.poll_interval_ms, 40);
    }

    #[test]
    fn rejects_overlap_not_below_window() {
        let cfg = AnalysisConfig {
            overlap: 256,
            ..AnalysisConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn hop_saturates_when_overlap_exceeds_window() {
        let cfg = AnalysisConfig {
            overlap: 300,
            ..AnalysisConfig::default()
        };
        assert_eq!(cfg.hop(), 1);
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn clip_multiple_must_be_positive_and_finite() {
        assert!(DisplayConfig::default().validate().is_ok());
        for bad in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let cfg = DisplayConfig { clip_multiple: bad };
            assert!(matches!(cfg.validate(), Err(CoreError::Config(_))), "{bad}");
        }
        let cfg: Config = toml::from_str("[display]\nclip_multiple = -2.5\n").unwrap();
        assert!(cfg.display.validate().is_err());
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_config(Path::new("/nonexistent/wavescope.toml")).is_none());
    }
}
