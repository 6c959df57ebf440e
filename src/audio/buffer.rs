use crate::error::{CoreError, Result};

/// Numeric encoding of each stored sample, preserved verbatim from the source container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
    Float64,
}

impl SampleFormat {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::Int8 => 8,
            SampleFormat::Int16 => 16,
            SampleFormat::Int24 => 24,
            SampleFormat::Int32 | SampleFormat::Float32 => 32,
            SampleFormat::Float64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32 | SampleFormat::Float64)
    }

    /// Maps a container header onto a supported format.
    pub fn from_header(bits_per_sample: u16, float: bool) -> Option<Self> {
        match (bits_per_sample, float) {
            (8, false) => Some(SampleFormat::Int8),
            (16, false) => Some(SampleFormat::Int16),
            (24, false) => Some(SampleFormat::Int24),
            (32, false) => Some(SampleFormat::Int32),
            (32, true) => Some(SampleFormat::Float32),
            (64, true) => Some(SampleFormat::Float64),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleFormat::Int8 => "int8",
            SampleFormat::Int16 => "int16",
            SampleFormat::Int24 => "int24",
            SampleFormat::Int32 => "int32",
            SampleFormat::Float32 => "float32",
            SampleFormat::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Interleaved PCM samples in their native representation.
///
/// 24-bit samples are held sign-extended in an `i32`.
#[derive(Clone, Debug, PartialEq)]
pub enum PcmData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I24(Vec<i32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PcmData {
    pub fn format(&self) -> SampleFormat {
        match self {
            PcmData::I8(_) => SampleFormat::Int8,
            PcmData::I16(_) => SampleFormat::Int16,
            PcmData::I24(_) => SampleFormat::Int24,
            PcmData::I32(_) => SampleFormat::Int32,
            PcmData::F32(_) => SampleFormat::Float32,
            PcmData::F64(_) => SampleFormat::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PcmData::I8(v) => v.len(),
            PcmData::I16(v) => v.len(),
            PcmData::I24(v) | PcmData::I32(v) => v.len(),
            PcmData::F32(v) => v.len(),
            PcmData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw sample value at `index` upcast to f64, without rescaling
    pub fn get_f64(&self, index: usize) -> f64 {
        match self {
            PcmData::I8(v) => v[index] as f64,
            PcmData::I16(v) => v[index] as f64,
            PcmData::I24(v) | PcmData::I32(v) => v[index] as f64,
            PcmData::F32(v) => v[index] as f64,
            PcmData::F64(v) => v[index],
        }
    }

    /// Sample at `index` scaled into [-1.0, 1.0] for an output device
    pub fn get_unit_f32(&self, index: usize) -> f32 {
        match self {
            PcmData::I8(v) => v[index] as f32 / 128.0,
            PcmData::I16(v) => v[index] as f32 / 32_768.0,
            PcmData::I24(v) => v[index] as f32 / 8_388_608.0,
            PcmData::I32(v) => (v[index] as f64 / 2_147_483_648.0) as f32,
            PcmData::F32(v) => v[index].clamp(-1.0, 1.0),
            PcmData::F64(v) => v[index].clamp(-1.0, 1.0) as f32,
        }
    }
}

/// Decoded audio. Immutable once built; shared between analysis and playback.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformBuffer {
    samples: PcmData,
    channels: u16,
    sample_rate: u32,
}

impl WaveformBuffer {
    pub fn new(samples: PcmData, channels: u16, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CoreError::ContainerFormat("sample rate must be positive".into()));
        }
        if channels == 0 {
            return Err(CoreError::ContainerFormat("channel count must be positive".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(CoreError::ContainerFormat(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &PcmData {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.samples.format()
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds: frames / sample_rate
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Averages every frame's channels into one f64 value (no rescaling).
    pub fn mono_f64(&self) -> Vec<f64> {
        let channels = self.channels as usize;
        (0..self.frames())
            .map(|frame| {
                let base = frame * channels;
                let sum: f64 = (0..channels).map(|c| self.samples.get_f64(base + c)).sum();
                sum / channels as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_frames_over_rate() {
        let buffer = WaveformBuffer::new(PcmData::I16(vec![0; 16_000]), 2, 8_000).unwrap();
        assert_eq!(buffer.frames(), 8_000);
        assert_eq!(buffer.duration(), 1.0);
    }

    #[test]
    fn empty_buffer_is_valid() {
        let buffer = WaveformBuffer::new(PcmData::F32(vec![]), 1, 44_100).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration(), 0.0);
    }

    #[test]
    fn rejects_zero_rate_and_ragged_frames() {
        assert!(matches!(
            WaveformBuffer::new(PcmData::I16(vec![1, 2]), 1, 0),
            Err(CoreError::ContainerFormat(_))
        ));
        assert!(matches!(
            WaveformBuffer::new(PcmData::I16(vec![1, 2, 3]), 2, 8_000),
            Err(CoreError::ContainerFormat(_))
        ));
    }

    #[test]
    fn mono_mix_averages_channels_without_rescaling() {
        let buffer = WaveformBuffer::new(PcmData::I16(vec![100, 300, -50, 50]), 2, 8_000).unwrap();
        assert_eq!(buffer.mono_f64(), vec![200.0, 0.0]);
    }

    #[test]
    fn unit_scaling_stays_in_range() {
        let data = PcmData::I16(vec![i16::MIN, i16::MAX]);
        assert_eq!(data.get_unit_f32(0), -1.0);
        assert!(data.get_unit_f32(1) < 1.0);
        let float = PcmData::F32(vec![3.0]);
        assert_eq!(float.get_unit_f32(0), 1.0);
        let double = PcmData::F64(vec![-2.0, 0.25]);
        assert_eq!(double.get_unit_f32(0), -1.0);
        assert_eq!(double.get_unit_f32(1), 0.25);
    }
}
