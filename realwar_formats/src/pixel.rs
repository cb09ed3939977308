//! ARGB1555 helpers.
//!
//! Real War textures set bit 15 to mark a pixel *transparent*, the inverse of
//! the usual 1555 convention, so the RGBA conversions here invert it.

use std::io::Write;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageResult};

pub const ALPHA_BIT: u16 = 0x8000;
pub const RGB_MASK: u16 = 0x7FFF;

/// Splits a pixel into its 5-bit red, green and blue channels.
pub fn channels(pixel: u16) -> [u8; 3] {
    [
        ((pixel >> 10) & 0x1F) as u8,
        ((pixel >> 5) & 0x1F) as u8,
        (pixel & 0x1F) as u8,
    ]
}

/// Packs 5-bit channels back into an opaque pixel. Inputs are masked.
pub fn pack(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r & 0x1F) << 10) | (u16::from(g & 0x1F) << 5) | u16::from(b & 0x1F)
}

pub fn is_transparent(pixel: u16) -> bool {
    pixel & ALPHA_BIT != 0
}

/// Scales a 5-bit value to the full 8-bit range.
pub fn expand5(value: u8) -> u8 {
    (u16::from(value & 0x1F) * 255 / 31) as u8
}

pub fn argb1555_to_rgba(pixel: u16) -> [u8; 4] {
    let [r, g, b] = channels(pixel);
    let a = if is_transparent(pixel) { 0 } else { 255 };
    [expand5(r), expand5(g), expand5(b), a]
}

/// Converts a whole plane to tightly packed RGBA8888 bytes.
pub fn argb1555_to_rgba8888(pixels: &[u16]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixels.len() * 4);
    for &pixel in pixels {
        rgba.extend_from_slice(&argb1555_to_rgba(pixel));
    }
    rgba
}

/// True when every pixel has equal red, green and blue channels.
pub fn is_grayscale(pixels: &[u16]) -> bool {
    pixels.iter().all(|&pixel| {
        let [r, g, b] = channels(pixel);
        r == g && g == b
    })
}

/// Decoded RGBA8888 image ready for an external consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaFrame {
    pub fn from_argb1555(width: u32, height: u32, pixels: &[u16]) -> Self {
        RgbaFrame {
            width,
            height,
            data: argb1555_to_rgba8888(pixels),
        }
    }

    pub fn write_png<W: Write>(&self, writer: W) -> ImageResult<()> {
        PngEncoder::new(writer).write_image(&self.data, self.width, self.height, ColorType::Rgba8)
    }
}
