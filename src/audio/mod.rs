pub mod analysis;
pub mod buffer;
pub mod decode;
pub mod spectrogram;

pub use buffer::{PcmData, SampleFormat, WaveformBuffer};
pub use spectrogram::SpectrogramResult;
