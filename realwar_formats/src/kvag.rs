use std::io::{self, Write};
use std::time::Duration;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::adpcm::{decode_mono, decode_stereo};
use crate::error::{FormatError, Result};
use crate::reader::ByteReader;

pub const KVAG_MAGIC: &[u8; 4] = b"KVAG";

/// Sample rate assumed for headerless streams. Half of 22050 Hz; not yet
/// verified against reference audio.
pub const LEGACY_SAMPLE_RATE: u32 = 11_025;

/// Decoded KVAG audio clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kvag {
    pub sample_rate: u32,
    pub stereo: bool,
    /// Set when the buffer had no `KVAG` header and was decoded as raw mono.
    pub headerless: bool,
    /// 16-bit PCM, interleaved left/right when `stereo`.
    pub samples: Vec<i16>,
}

impl Kvag {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_fallback_rate(bytes, LEGACY_SAMPLE_RATE)
    }

    /// Like [`Kvag::from_bytes`] but with a caller-chosen rate for headerless
    /// streams.
    pub fn from_bytes_with_fallback_rate(bytes: &[u8], fallback_rate: u32) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        if !reader.consume_tag_if(KVAG_MAGIC) {
            log::debug!(
                "no KVAG header, decoding {} bytes as headerless mono at {fallback_rate} Hz",
                bytes.len()
            );
            return Ok(Kvag {
                sample_rate: fallback_rate,
                stereo: false,
                headerless: true,
                samples: decode_mono(bytes),
            });
        }

        let data_size = reader.read_u32("KVAG data size")? as usize;
        let sample_rate = reader.read_u32("KVAG sample rate")?;
        let channel_flag = reader.read_u16("KVAG stereo flag")?;
        if sample_rate == 0 {
            return Err(FormatError::UnsupportedVariant(
                "KVAG header declares a zero sample rate".into(),
            ));
        }
        if channel_flag > 1 {
            log::warn!("KVAG stereo flag {channel_flag} is neither 0 nor 1; decoding as mono");
        }
        let stereo = channel_flag == 1;

        let data = reader.read_bytes(data_size, "KVAG ADPCM data")?;
        if reader.remaining() > 0 {
            log::debug!("KVAG has {} bytes past the ADPCM data", reader.remaining());
        }

        let samples = if stereo {
            decode_stereo(data)
        } else {
            decode_mono(data)
        };

        Ok(Kvag {
            sample_rate,
            stereo,
            headerless: false,
            samples,
        })
    }

    pub fn channels(&self) -> u16 {
        if self.stereo { 2 } else { 1 }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Writes the PCM as a 16-bit RIFF/WAVE file.
    pub fn write_wav<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let channels = self.channels();
        let block_align = channels * 2;
        let data_len = u32::try_from(self.samples.len() * 2)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PCM too large for WAV"))?;

        writer.write_all(b"RIFF")?;
        writer.write_u32::<LittleEndian>(36 + data_len)?;
        writer.write_all(b"WAVE")?;
        writer.write_all(b"fmt ")?;
        writer.write_u32::<LittleEndian>(16)?;
        writer.write_u16::<LittleEndian>(1)?; // PCM
        writer.write_u16::<LittleEndian>(channels)?;
        writer.write_u32::<LittleEndian>(self.sample_rate)?;
        writer.write_u32::<LittleEndian>(self.sample_rate * u32::from(block_align))?;
        writer.write_u16::<LittleEndian>(block_align)?;
        writer.write_u16::<LittleEndian>(16)?;
        writer.write_all(b"data")?;
        writer.write_u32::<LittleEndian>(data_len)?;
        for &sample in &self.samples {
            writer.write_i16::<LittleEndian>(sample)?;
        }
        Ok(())
    }
}
