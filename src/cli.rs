use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wavescope", about = "Decode base64 WAV payloads, inspect their spectrum and play them back")]
pub struct Cli {
    /// Base64 text file wrapping a WAV container
    pub input: PathBuf,

    /// Config file (defaults to ./wavescope.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Play the audio, tracking the position until it ends
    #[arg(long)]
    pub play: bool,

    /// Track playback without opening an audio device
    #[arg(long)]
    pub silent: bool,

    /// Re-encode the audio to this WAV file
    #[arg(short, long)]
    pub save: Option<PathBuf>,

    /// Write the spectrogram, profiles and clipped heat map as JSON
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Skip spectrogram analysis
    #[arg(long)]
    pub no_analysis: bool,

    /// STFT window length in samples
    #[arg(long, default_value_t = 256)]
    pub window_length: usize,

    /// Samples shared by consecutive windows
    #[arg(long, default_value_t = 32)]
    pub overlap: usize,

    /// Heat-map ceiling as a multiple of the mean energy
    #[arg(long, default_value_t = 10.0)]
    pub clip_multiple: f64,

    /// Position polling interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,
}
