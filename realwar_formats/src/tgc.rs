use crate::error::Result;
use crate::pixel::RgbaFrame;
use crate::reader::ByteReader;
use crate::rle::decode_rle16;

/// Bytes between the end of the RLE stream and the trailer word.
const END_MARKER_LEN: usize = 4;

/// Single-frame RLE16 texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tgc {
    pub width: u16,
    pub height: u16,
    /// ARGB1555 pixels, `width * height` long.
    pub pixels: Vec<u16>,
    /// Opaque trailing word, kept verbatim.
    pub trailer: u32,
}

impl Tgc {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let width = reader.read_u16("TGC width")?;
        let height = reader.read_u16("TGC height")?;
        let pixel_count = usize::from(width) * usize::from(height);

        let rle = decode_rle16(bytes, reader.position(), pixel_count)?;
        reader.seek(rle.end_offset, "TGC RLE stream")?;
        reader.skip(END_MARKER_LEN, "TGC end marker")?;
        let trailer = reader.read_u32("TGC trailer")?;

        log::debug!(
            "decoded TGC {width}x{height}, trailer {trailer:#010x}, {} bytes unread",
            reader.remaining()
        );

        Ok(Tgc {
            width,
            height,
            pixels: rle.words,
            trailer,
        })
    }

    pub fn to_rgba(&self) -> RgbaFrame {
        RgbaFrame::from_argb1555(u32::from(self.width), u32::from(self.height), &self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    fn build_tgc(width: u16, height: u16, stream: &[u16], trailer: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        for word in stream {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; END_MARKER_LEN]);
        data.extend_from_slice(&trailer.to_le_bytes());
        data
    }

    #[test]
    fn decodes_pixels_and_trailer() {
        // 3x2 image: a fill run of red, a literal run, then a fill run of blue.
        let stream = [0x0002, 0x7C00, 0x8002, 0x03E0, 0x0001, 0x0002, 0x001F, 0xFFFF];
        let data = build_tgc(3, 2, &stream, 0xDEAD_BEEF);

        let tgc = Tgc::from_bytes(&data).expect("decode succeeds");
        assert_eq!(tgc.width, 3);
        assert_eq!(tgc.height, 2);
        assert_eq!(
            tgc.pixels,
            vec![0x7C00, 0x7C00, 0x03E0, 0x0001, 0x001F, 0x001F]
        );
        assert_eq!(tgc.trailer, 0xDEAD_BEEF);
    }

    #[test]
    fn exact_pixels_round_trip_through_literal_runs() {
        let pixels: Vec<u16> = (0..12).map(|i| 0x0400 * (i % 4) + i).collect();
        let mut stream = vec![0x8000 | pixels.len() as u16];
        stream.extend_from_slice(&pixels);
        stream.push(0xFFFF);
        let data = build_tgc(4, 3, &stream, 0x0000_0102);

        let tgc = Tgc::from_bytes(&data).unwrap();
        assert_eq!(tgc.pixels, pixels);
        assert_eq!(tgc.trailer, 0x0000_0102);
        assert_eq!(tgc.to_rgba().data.len(), 4 * 3 * 4);
    }

    #[test]
    fn missing_trailer_is_truncated() {
        let mut data = build_tgc(1, 1, &[0x0001, 0x1234, 0xFFFF], 7);
        data.truncate(data.len() - 2);
        let err = Tgc::from_bytes(&data).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TruncatedData {
                what: "TGC trailer",
                ..
            }
        ));
    }
}
