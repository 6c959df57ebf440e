use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::{Cursor, Read};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_PCM_F64LE};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::{PcmData, SampleFormat, WaveformBuffer};
use crate::error::{CoreError, Result};

/// Decode a base64-wrapped WAV container into a [`WaveformBuffer`].
///
/// Line breaks and other ASCII whitespace anywhere in the text are ignored.
pub fn decode(base64_text: &str) -> Result<WaveformBuffer> {
    let compact: String = base64_text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    log::debug!("base64 payload decoded to {} bytes", bytes.len());
    decode_bytes(&bytes)
}

/// Read a base64 text file from disk and decode it
pub fn decode_file(path: &Path) -> Result<WaveformBuffer> {
    let text = std::fs::read_to_string(path)?;
    decode(&text)
}

/// Parse raw WAV bytes. Fails rather than returning a partially filled buffer.
pub fn decode_bytes(bytes: &[u8]) -> Result<WaveformBuffer> {
    let buffer = match hound::WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => {
            let spec = reader.spec();
            let format = SampleFormat::from_header(
                spec.bits_per_sample,
                spec.sample_format == hound::SampleFormat::Float,
            )
            .ok_or_else(|| {
                CoreError::ContainerFormat(format!(
                    "unsupported sample layout: {} bits, {:?}",
                    spec.bits_per_sample, spec.sample_format
                ))
            })?;
            let samples = read_samples(reader, format)?;
            WaveformBuffer::new(samples, spec.channels, spec.sample_rate)?
        }
        // hound's header parser stops at 32-bit float
        Err(e @ (hound::Error::FormatError(_) | hound::Error::Unsupported)) => {
            match read_float64(bytes)? {
                Some(buffer) => buffer,
                None => return Err(e.into()),
            }
        }
        Err(e) => return Err(parse_error(e)),
    };

    log::info!(
        "Decoded audio: {} frames x {} ch, {}Hz, {}, {:.2}s",
        buffer.frames(),
        buffer.channels(),
        buffer.sample_rate(),
        buffer.sample_format(),
        buffer.duration()
    );

    Ok(buffer)
}

fn read_samples<R: Read>(mut reader: hound::WavReader<R>, format: SampleFormat) -> Result<PcmData> {
    let declared = reader.len() as usize;
    let samples = match format {
        SampleFormat::Int8 => PcmData::I8(collect(reader.samples::<i8>())?),
        SampleFormat::Int16 => PcmData::I16(collect(reader.samples::<i16>())?),
        SampleFormat::Int24 => PcmData::I24(collect(reader.samples::<i32>())?),
        SampleFormat::Int32 => PcmData::I32(collect(reader.samples::<i32>())?),
        SampleFormat::Float32 => PcmData::F32(collect(reader.samples::<f32>())?),
        SampleFormat::Float64 => {
            return Err(CoreError::ContainerFormat(
                "64-bit float samples behind a 32-bit reader".into(),
            ))
        }
    };
    check_declared(samples.len(), declared)?;
    Ok(samples)
}

/// Reads a 64-bit IEEE float container through symphonia's WAV demuxer.
///
/// Returns `Ok(None)` when the bytes are not that layout, so the caller can
/// surface its own parse error instead.
fn read_float64(bytes: &[u8]) -> Result<Option<WaveformBuffer>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(_) => return Ok(None),
    };
    let mut format = probed.format;

    let track = match format.default_track() {
        Some(track) if track.codec_params.codec == CODEC_TYPE_PCM_F64LE => track,
        _ => return Ok(None),
    };
    let track_id = track.id;
    let params = track.codec_params.clone();
    let channels = params.channels.map_or(0, |c| c.count()) as u16;
    let sample_rate = params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(container_error)?;

    let mut samples: Vec<f64> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(container_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(container_error)?;
        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f64>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if let Some(frames) = params.n_frames {
        check_declared(samples.len(), frames as usize * channels as usize)?;
    }
    WaveformBuffer::new(PcmData::F64(samples), channels, sample_rate).map(Some)
}

fn check_declared(found: usize, declared: usize) -> Result<()> {
    if found != declared {
        return Err(CoreError::ContainerFormat(format!(
            "payload holds {} samples, header declares {}",
            found, declared
        )));
    }
    Ok(())
}

fn container_error(e: symphonia::core::errors::Error) -> CoreError {
    CoreError::ContainerFormat(e.to_string())
}

fn collect<T, I>(samples: I) -> Result<Vec<T>>
where
    I: Iterator<Item = hound::Result<T>>,
{
    samples
        .collect::<hound::Result<Vec<T>>>()
        .map_err(parse_error)
}

/// Reading from memory only hits I/O errors when the container ends early.
fn parse_error(e: hound::Error) -> CoreError {
    match e {
        hound::Error::IoError(io) => CoreError::ContainerFormat(format!("truncated container: {}", io)),
        other => CoreError::from(other),
    }
}
