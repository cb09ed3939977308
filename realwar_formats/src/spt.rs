use crate::error::Result;
use crate::pixel::RgbaFrame;
use crate::reader::{ByteReader, plane_len};
use crate::rle::decode_rle16;

/// Low 30 bits of the SPT/S16 header carry the frame count.
pub const FRAME_COUNT_MASK: u32 = 0x3FFF_FFFF;
/// Top bit of the SPT header: every frame is RLE16 encoded.
pub const RLE_FLAG: u32 = 0x8000_0000;

/// Multi-frame ARGB1555 sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spt {
    pub rle: bool,
    pub frames: Vec<SptFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SptFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u16>,
}

impl SptFrame {
    pub fn to_rgba(&self) -> RgbaFrame {
        RgbaFrame::from_argb1555(self.width, self.height, &self.pixels)
    }
}

/// Reads the `u32` header and frame pointer table shared by SPT and S16.
pub(crate) fn read_frame_table(reader: &mut ByteReader<'_>) -> Result<(u32, Vec<u32>)> {
    let header = reader.read_u32("frame table header")?;
    let frame_count = (header & FRAME_COUNT_MASK) as usize;
    let pointers = reader.read_u32_array(frame_count, "frame pointer table")?;
    Ok((header, pointers))
}

impl Spt {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let (header, pointers) = read_frame_table(&mut reader)?;
        let rle = header & RLE_FLAG != 0;

        let mut frames = Vec::with_capacity(pointers.len());
        for &pointer in &pointers {
            reader.seek(pointer as usize, "SPT frame pointer")?;
            let width = reader.read_u32("SPT frame width")?;
            let height = reader.read_u32("SPT frame height")?;
            let pixel_count = plane_len(width, height, pointer as usize)?;

            let pixels = if rle {
                decode_rle16(bytes, reader.position(), pixel_count)?.words
            } else {
                reader.read_u16_array(pixel_count, "SPT raw pixels")?
            };

            frames.push(SptFrame {
                width,
                height,
                pixels,
            });
        }

        log::debug!("decoded SPT with {} frames (rle={rle})", frames.len());
        Ok(Spt { rle, frames })
    }
}
