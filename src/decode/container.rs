//! Container header parsing for WAV, AIFF/AIFC and Sun AU files.
//!
//! Each parser consumes the header and leaves the reader positioned at the
//! first byte of sample data, so the PCM stream can read frames directly.
//! WAV headers go through `hound`; AIFF and AU are small enough to read by hand.

use std::io::{Read, Seek, SeekFrom};

use crate::error::AudioError;
use crate::media::format::{AudioFormatDescriptor, EncodingKind};
use crate::media::probe::ContainerKind;
use crate::media::source::ReadSeek;

/// What the header says about the sample data that follows it.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub format: AudioFormatDescriptor,
    pub total_frames: u64,
}

const AU_UNKNOWN_SIZE: u32 = 0xFFFF_FFFF;

pub fn read_header(
    kind: ContainerKind,
    reader: Box<dyn ReadSeek>,
    source_len: u64,
) -> Result<(ContainerInfo, Box<dyn ReadSeek>), AudioError> {
    match kind {
        ContainerKind::Wav => read_wav_header(reader),
        ContainerKind::Aiff => read_aiff_header(reader),
        ContainerKind::Au => read_au_header(reader, source_len),
    }
}

fn read_wav_header(
    reader: Box<dyn ReadSeek>,
) -> Result<(ContainerInfo, Box<dyn ReadSeek>), AudioError> {
    let wav = hound::WavReader::new(reader)?;
    let spec = wav.spec();

    let encoding_kind = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => EncodingKind::PcmFloat,
        (hound::SampleFormat::Float, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{bits}-bit float WAV"
            )));
        }
        (hound::SampleFormat::Int, 8) => EncodingKind::PcmUnsigned,
        (hound::SampleFormat::Int, _) => EncodingKind::PcmSigned,
    };

    let info = ContainerInfo {
        format: AudioFormatDescriptor {
            sample_rate_hz: spec.sample_rate as f64,
            channel_count: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            big_endian: false,
            encoding_kind,
            estimated: false,
        },
        total_frames: wav.duration() as u64,
    };

    log::debug!("WAV header: {spec:?}, {} frames", info.total_frames);

    Ok((info, wav.into_inner()))
}

fn read_aiff_header(
    mut reader: Box<dyn ReadSeek>,
) -> Result<(ContainerInfo, Box<dyn ReadSeek>), AudioError> {
    if &read_fourcc(&mut reader)? != b"FORM" {
        return Err(AudioError::UnsupportedFormat("not an AIFF file".into()));
    }
    let _form_size = read_u32_be(&mut reader)?;
    let form_type = read_fourcc(&mut reader)?;
    let is_aifc = match &form_type {
        b"AIFF" => false,
        b"AIFC" => true,
        _ => return Err(AudioError::UnsupportedFormat("not an AIFF file".into())),
    };

    let mut common: Option<(u16, u32, u16, f64, [u8; 4])> = None;

    // Walk chunks until sound data; COMM has to come first
    loop {
        let chunk_id = match read_fourcc(&mut reader) {
            Ok(id) => id,
            Err(AudioError::IoFailure(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(AudioError::UnsupportedFormat(
                    "AIFF file has no SSND chunk".into(),
                ));
            }
            Err(e) => return Err(e),
        };
        let chunk_size = read_u32_be(&mut reader)?;

        match &chunk_id {
            b"COMM" => {
                let channels = read_u16_be(&mut reader)?;
                let frames = read_u32_be(&mut reader)?;
                let sample_size = read_u16_be(&mut reader)?;
                let sample_rate = read_f80_be(&mut reader)?;
                let mut consumed = 18u32;
                let mut compression = *b"NONE";
                if is_aifc && chunk_size >= 22 {
                    compression = read_fourcc(&mut reader)?;
                    consumed += 4;
                }
                skip(&mut reader, padded(chunk_size).saturating_sub(consumed as u64))?;
                common = Some((channels, frames, sample_size, sample_rate, compression));
            }
            b"SSND" => {
                let (channels, frames, sample_size, sample_rate, compression) = common
                    .ok_or_else(|| {
                        AudioError::UnsupportedFormat("AIFF SSND chunk before COMM".into())
                    })?;
                let offset = read_u32_be(&mut reader)?;
                let _block_size = read_u32_be(&mut reader)?;
                skip(&mut reader, offset as u64)?;

                let (big_endian, encoding_kind) = match &compression {
                    b"NONE" | b"twos" => (true, EncodingKind::PcmSigned),
                    b"sowt" => (false, EncodingKind::PcmSigned),
                    b"fl32" | b"FL32" if sample_size == 32 => (true, EncodingKind::PcmFloat),
                    other => {
                        return Err(AudioError::UnsupportedFormat(format!(
                            "AIFC compression '{}'",
                            String::from_utf8_lossy(other)
                        )));
                    }
                };

                let format = AudioFormatDescriptor {
                    sample_rate_hz: sample_rate,
                    channel_count: channels,
                    bits_per_sample: sample_size,
                    big_endian,
                    encoding_kind,
                    estimated: false,
                };
                validate(&format)?;

                let data_len = (chunk_size as u64).saturating_sub(8 + offset as u64);
                let total_frames = (frames as u64).min(data_len / format.frame_size() as u64);

                return Ok((
                    ContainerInfo {
                        format,
                        total_frames,
                    },
                    reader,
                ));
            }
            _ => skip(&mut reader, padded(chunk_size))?,
        }
    }
}

fn read_au_header(
    mut reader: Box<dyn ReadSeek>,
    source_len: u64,
) -> Result<(ContainerInfo, Box<dyn ReadSeek>), AudioError> {
    if &read_fourcc(&mut reader)? != b".snd" {
        return Err(AudioError::UnsupportedFormat("not an AU file".into()));
    }
    let data_offset = read_u32_be(&mut reader)?;
    let data_size = read_u32_be(&mut reader)?;
    let encoding = read_u32_be(&mut reader)?;
    let sample_rate = read_u32_be(&mut reader)?;
    let channels = read_u32_be(&mut reader)?;

    if data_offset < 24 {
        return Err(AudioError::UnsupportedFormat("AU header too short".into()));
    }
    skip(&mut reader, data_offset as u64 - 24)?;

    let (bits_per_sample, encoding_kind) = match encoding {
        2 => (8, EncodingKind::PcmSigned),
        3 => (16, EncodingKind::PcmSigned),
        4 => (24, EncodingKind::PcmSigned),
        5 => (32, EncodingKind::PcmSigned),
        6 => (32, EncodingKind::PcmFloat),
        1 => return Err(AudioError::UnsupportedFormat("AU mu-law encoding".into())),
        other => {
            return Err(AudioError::UnsupportedFormat(format!(
                "AU encoding {other}"
            )));
        }
    };

    let format = AudioFormatDescriptor {
        sample_rate_hz: sample_rate as f64,
        channel_count: u16::try_from(channels)
            .map_err(|_| AudioError::UnsupportedFormat(format!("{channels} channels")))?,
        bits_per_sample,
        big_endian: true,
        encoding_kind,
        estimated: false,
    };
    validate(&format)?;

    let available = source_len.saturating_sub(data_offset as u64);
    let data_len = if data_size == AU_UNKNOWN_SIZE {
        available
    } else {
        data_size as u64
    };

    Ok((
        ContainerInfo {
            total_frames: data_len / format.frame_size() as u64,
            format,
        },
        reader,
    ))
}

fn validate(format: &AudioFormatDescriptor) -> Result<(), AudioError> {
    if format.channel_count == 0 {
        return Err(AudioError::UnsupportedFormat("zero channels".into()));
    }
    if !(format.sample_rate_hz.is_finite() && format.sample_rate_hz > 0.0) {
        return Err(AudioError::UnsupportedFormat("invalid sample rate".into()));
    }
    if !matches!(format.bits_per_sample, 8 | 16 | 24 | 32) {
        return Err(AudioError::UnsupportedFormat(format!(
            "{}-bit samples",
            format.bits_per_sample
        )));
    }
    Ok(())
}

/// Chunk payloads are padded to an even length
fn padded(size: u32) -> u64 {
    size as u64 + (size as u64 & 1)
}

fn skip(reader: &mut impl Seek, bytes: u64) -> Result<(), AudioError> {
    if bytes > 0 {
        reader.seek(SeekFrom::Current(bytes as i64))?;
    }
    Ok(())
}

fn read_fourcc(reader: &mut impl Read) -> Result<[u8; 4], AudioError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u16_be(reader: &mut impl Read) -> Result<u16, AudioError> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32_be(reader: &mut impl Read) -> Result<u32, AudioError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// IEEE 754 80-bit extended float: sign | 15-bit exponent | 64-bit significand
/// with an explicit integer bit.
fn read_f80_be(reader: &mut impl Read) -> Result<f64, AudioError> {
    let mut buf = [0u8; 10];
    reader.read_exact(&mut buf)?;
    Ok(f80_to_f64(&buf))
}

fn f80_to_f64(bytes: &[u8; 10]) -> f64 {
    let sign_exp = u16::from_be_bytes([bytes[0], bytes[1]]);
    let mut sig = [0u8; 8];
    sig.copy_from_slice(&bytes[2..]);
    let significand = u64::from_be_bytes(sig);

    let exponent = (sign_exp & 0x7FFF) as i32;
    if exponent == 0 && significand == 0 {
        return 0.0;
    }
    if exponent == 0x7FFF {
        return f64::NAN;
    }

    let value = significand as f64 * 2f64.powi(exponent - 16383 - 63);
    if sign_exp & 0x8000 != 0 { -value } else { value }
}
