//! 16-bit run-length codec shared by the TGC and SPT image containers.
//!
//! The stream is a sequence of little-endian control words. `0xFFFF` ends the
//! stream; otherwise the low 15 bits give a run length and bit 15 selects
//! between a literal run (copy the next `n` words) and a fill run (repeat the
//! next word `n` times).

use crate::error::{FormatError, Result};
use crate::reader::ByteReader;

pub const RLE_TERMINATOR: u16 = 0xFFFF;
const LITERAL_FLAG: u16 = 0x8000;
const RUN_MASK: u16 = 0x7FFF;

/// Words produced by [`decode_rle16`] and where the stream stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleOutput {
    pub words: Vec<u16>,
    /// Byte offset just past the last consumed word (terminator included).
    pub end_offset: usize,
    pub terminated: bool,
}

/// Decodes an RLE16 stream starting at `offset` into exactly `output_len`
/// words. Words the stream never reaches stay zero.
pub fn decode_rle16(bytes: &[u8], offset: usize, output_len: usize) -> Result<RleOutput> {
    let mut reader = ByteReader::at(bytes, offset, "RLE16 stream start")?;
    let mut words = vec![0u16; output_len];
    let mut written = 0usize;
    let mut terminated = false;

    while reader.remaining() >= 2 {
        let control_offset = reader.position();
        let control = reader.read_u16("RLE16 control word")?;
        if control == RLE_TERMINATOR {
            terminated = true;
            break;
        }

        let run = usize::from(control & RUN_MASK);
        let end = written + run;
        if end > output_len {
            return Err(FormatError::corrupt(
                control_offset,
                format!(
                    "RLE16 run of {run} words at word {written} overflows {output_len}-word output"
                ),
            ));
        }

        if control & LITERAL_FLAG != 0 {
            reader.ensure_records(run, 2, "RLE16 literal run")?;
            for slot in &mut words[written..end] {
                *slot = reader.read_u16("RLE16 literal run")?;
            }
        } else {
            let value = reader.read_u16("RLE16 fill value")?;
            words[written..end].fill(value);
        }
        written = end;
    }

    if written < output_len {
        log::debug!(
            "RLE16 stream at {offset:#x} filled {written} of {output_len} words (terminated={terminated})"
        );
    }

    Ok(RleOutput {
        words,
        end_offset: reader.position(),
        terminated,
    })
}
