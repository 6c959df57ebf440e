use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use crate::audio::buffer::{PcmData, WaveformBuffer};
use crate::error::{CoreError, Result};

/// Write `buffer` as a WAV file at `destination` with its original rate, layout and sample format.
pub fn encode(buffer: &WaveformBuffer, destination: &Path) -> Result<()> {
    let file = std::fs::File::create(destination)?;
    write_container(buffer, BufWriter::new(file))?;
    log::info!(
        "Wrote {} frames ({}, {}Hz) to {}",
        buffer.frames(),
        buffer.sample_format(),
        buffer.sample_rate(),
        destination.display()
    );
    Ok(())
}

/// Serialize `buffer` into an in-memory WAV container
pub fn encode_to_bytes(buffer: &WaveformBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_container(buffer, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Serialize `buffer` and wrap it as a single unbroken base64 line
pub fn encode_to_base64(buffer: &WaveformBuffer) -> Result<String> {
    Ok(STANDARD.encode(encode_to_bytes(buffer)?))
}

fn spec_for(buffer: &WaveformBuffer) -> hound::WavSpec {
    let format = buffer.sample_format();
    hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bits_per_sample(),
        sample_format: if format.is_float() {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    }
}

fn write_container<W: Write + Seek>(buffer: &WaveformBuffer, sink: W) -> Result<()> {
    if let PcmData::F64(samples) = buffer.samples() {
        return write_float64(buffer, samples, sink);
    }
    let mut writer = hound::WavWriter::new(sink, spec_for(buffer))?;
    match buffer.samples() {
        PcmData::I8(v) => write_all(&mut writer, v)?,
        PcmData::I16(v) => write_all(&mut writer, v)?,
        PcmData::I24(v) | PcmData::I32(v) => write_all(&mut writer, v)?,
        PcmData::F32(v) => write_all(&mut writer, v)?,
        PcmData::F64(_) => unreachable!("64-bit float is written by write_float64"),
    }
    writer.finalize()?;
    Ok(())
}

/// hound only writes up to 32-bit float, so this layout is assembled by hand:
/// an 18-byte `fmt ` chunk with format tag 3, a `fact` frame count, then
/// little-endian samples in `data`.
fn write_float64<W: Write>(buffer: &WaveformBuffer, samples: &[f64], mut sink: W) -> Result<()> {
    const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;
    let too_large = || CoreError::ContainerFormat("audio exceeds the 4 GiB WAV limit".into());

    let channels = buffer.channels();
    let block_align = channels.checked_mul(8).ok_or_else(too_large)?;
    let data_len = u32::try_from(samples.len() * 8).map_err(|_| too_large())?;
    let frames = u32::try_from(buffer.frames()).map_err(|_| too_large())?;
    let riff_len = data_len.checked_add(4 + 26 + 12 + 8).ok_or_else(too_large)?;
    let byte_rate = buffer.sample_rate().saturating_mul(block_align as u32);

    let mut header = Vec::with_capacity(58);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&riff_len.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&18u32.to_le_bytes());
    header.extend_from_slice(&WAVE_FORMAT_IEEE_FLOAT.to_le_bytes());
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&64u16.to_le_bytes());
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(b"fact");
    header.extend_from_slice(&4u32.to_le_bytes());
    header.extend_from_slice(&frames.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());

    sink.write_all(&header)?;
    for sample in samples {
        sink.write_all(&sample.to_le_bytes())?;
    }
    sink.flush()?;
    Ok(())
}

fn write_all<W, S>(writer: &mut hound::WavWriter<W>, samples: &[S]) -> Result<()>
where
    W: Write + Seek,
    S: hound::Sample + Copy,
{
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::{decode, decode_file};

    fn roundtrip(buffer: WaveformBuffer) {
        let text = encode_to_base64(&buffer).unwrap();
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.sample_rate(), buffer.sample_rate());
        assert_eq!(decoded.sample_format(), buffer.sample_format());
        assert_eq!(decoded.channels(), buffer.channels());
        assert_eq!(decoded, buffer);
    }

    #[test]
    fn preserves_every_sample_format() {
        roundtrip(WaveformBuffer::new(PcmData::I8(vec![-128, -1, 0, 1, 127]), 1, 11_025).unwrap());
        roundtrip(WaveformBuffer::new(PcmData::I16(vec![i16::MIN, 0, i16::MAX, 7]), 2, 22_050).unwrap());
        roundtrip(WaveformBuffer::new(PcmData::I24(vec![-8_388_608, 0, 8_388_607]), 3, 48_000).unwrap());
        roundtrip(WaveformBuffer::new(PcmData::I32(vec![i32::MIN, -5, i32::MAX]), 1, 96_000).unwrap());
        roundtrip(WaveformBuffer::new(PcmData::F32(vec![-0.75, 0.0, 1.5e-7, 0.999]), 1, 44_100).unwrap());
        roundtrip(WaveformBuffer::new(PcmData::F64(vec![-0.5, 1e-300, 0.1, 0.999_999_999_9]), 2, 48_000).unwrap());
    }

    #[test]
    fn float64_header_is_ieee_float() {
        let buffer = WaveformBuffer::new(PcmData::F64(vec![0.25; 6]), 3, 16_000).unwrap();
        let bytes = encode_to_bytes(&buffer).unwrap();
        assert_eq!(bytes.len(), 58 + 6 * 8);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 3);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 64);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize, bytes.len() - 8);
    }

    #[test]
    fn writes_a_readable_file() {
        let buffer = WaveformBuffer::new(PcmData::I16(vec![10, -10, 20, -20]), 2, 8_000).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("out.wav");
        encode(&buffer, &wav_path).unwrap();

        let bytes = std::fs::read(&wav_path).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        let text_path = dir.path().join("out.txt");
        std::fs::write(&text_path, STANDARD.encode(&bytes)).unwrap();
        assert_eq!(decode_file(&text_path).unwrap(), buffer);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let buffer = WaveformBuffer::new(PcmData::I16(vec![1]), 1, 8_000).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        assert!(matches!(encode(&buffer, &path), Err(crate::error::CoreError::Io(_))));
    }
}
