use crate::error::{FormatError, Result};
use crate::pixel::{RgbaFrame, channels, expand5};
use crate::reader::{ByteReader, plane_len};
use crate::spt::read_frame_table;

/// Multi-frame paletted sprite with a separate 5-bit alpha plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S16 {
    pub frames: Vec<S16Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S16Frame {
    pub width: u32,
    pub height: u32,
    /// ARGB1555 palette entries.
    pub palette: Vec<u16>,
    /// One palette index per pixel.
    pub color_indices: Vec<u8>,
    /// One alpha value (0-31) per pixel.
    pub alpha: Vec<u8>,
}

impl S16Frame {
    /// Expands the palette and alpha plane into RGBA8888.
    pub fn to_rgba(&self) -> RgbaFrame {
        let mut data = Vec::with_capacity(self.color_indices.len() * 4);
        for (&index, &alpha) in self.color_indices.iter().zip(&self.alpha) {
            let color = self.palette.get(usize::from(index)).copied().unwrap_or(0);
            let [r, g, b] = channels(color);
            data.extend_from_slice(&[expand5(r), expand5(g), expand5(b), expand5(alpha)]);
        }
        RgbaFrame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl S16 {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let (_, pointers) = read_frame_table(&mut reader)?;

        let mut frames = Vec::with_capacity(pointers.len());
        for (frame_index, &pointer) in pointers.iter().enumerate() {
            reader.seek(pointer as usize, "S16 frame pointer")?;
            let width = reader.read_u32("S16 frame width")?;
            let height = reader.read_u32("S16 frame height")?;
            let pixel_count = plane_len(width, height, pointer as usize)?;

            let palette_len = usize::from(reader.read_u16("S16 palette length")?);
            let palette = reader.read_u16_array(palette_len, "S16 palette")?;

            let indices_offset = reader.position();
            let color_indices = reader
                .read_bytes(pixel_count, "S16 color indices")?
                .to_vec();
            if let Some(bad) = color_indices
                .iter()
                .position(|&index| usize::from(index) >= palette_len)
            {
                return Err(FormatError::corrupt(
                    indices_offset + bad,
                    format!(
                        "frame {frame_index} color index {} outside {palette_len}-entry palette",
                        color_indices[bad]
                    ),
                ));
            }

            let alpha_offset = reader.position();
            let alpha = reader.read_bytes(pixel_count, "S16 alpha plane")?.to_vec();
            if let Some(bad) = alpha.iter().position(|&value| value > 31) {
                log::warn!(
                    "S16 frame {frame_index} alpha {} at {:#x} exceeds 31; keeping low five bits",
                    alpha[bad],
                    alpha_offset + bad
                );
            }

            frames.push(S16Frame {
                width,
                height,
                palette,
                color_indices,
                alpha,
            });
        }

        log::debug!("decoded S16 with {} frames", frames.len());
        Ok(S16 { frames })
    }
}
