use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{FormatError, Result};

/// Little-endian cursor over an in-memory asset.
///
/// Every read checks the remaining length first so running off the end of the
/// buffer surfaces as [`FormatError::TruncatedData`] carrying the failing
/// offset instead of a bare I/O error.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader {
            cursor: Cursor::new(bytes),
        }
    }

    /// Reader positioned at `offset`, which may equal the buffer length.
    pub fn at(bytes: &'a [u8], offset: usize, what: &'static str) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        reader.seek(offset, what)?;
        Ok(reader)
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn seek(&mut self, offset: usize, what: &'static str) -> Result<()> {
        if offset > self.len() {
            return Err(FormatError::TruncatedData {
                what,
                offset,
                needed: offset - self.len(),
                available: 0,
            });
        }
        self.cursor.set_position(offset as u64);
        Ok(())
    }

    pub fn ensure(&self, needed: usize, what: &'static str) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(FormatError::TruncatedData {
                what,
                offset: self.position(),
                needed,
                available,
            });
        }
        Ok(())
    }

    /// Checks that `count` records of `size` bytes are available before any
    /// allocation sized from an untrusted header count.
    pub fn ensure_records(&self, count: usize, size: usize, what: &'static str) -> Result<()> {
        let needed = count.checked_mul(size).ok_or_else(|| {
            FormatError::corrupt(
                self.position(),
                format!("{what}: {count} records of {size} bytes overflows"),
            )
        })?;
        self.ensure(needed, what)
    }

    pub fn skip(&mut self, count: usize, what: &'static str) -> Result<()> {
        self.ensure(count, what)?;
        let target = self.position() + count;
        self.cursor.set_position(target as u64);
        Ok(())
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        self.ensure(2, what)?;
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated(2, what))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        self.ensure(4, what)?;
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated(4, what))
    }

    pub fn read_f32(&mut self, what: &'static str) -> Result<f32> {
        self.ensure(4, what)?;
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| self.truncated(4, what))
    }

    pub fn read_bytes(&mut self, count: usize, what: &'static str) -> Result<&'a [u8]> {
        self.ensure(count, what)?;
        let start = self.position();
        let bytes: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + count) as u64);
        Ok(&bytes[start..start + count])
    }

    pub fn read_u16_array(&mut self, count: usize, what: &'static str) -> Result<Vec<u16>> {
        self.ensure_records(count, 2, what)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_u16(what)?);
        }
        Ok(values)
    }

    pub fn read_u32_array(&mut self, count: usize, what: &'static str) -> Result<Vec<u32>> {
        self.ensure_records(count, 4, what)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_u32(what)?);
        }
        Ok(values)
    }

    pub fn read_tag(&mut self, what: &'static str) -> Result<[u8; 4]> {
        let bytes = self.read_bytes(4, what)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Consumes a section tag, failing with the tag's offset on mismatch.
    pub fn expect_tag(&mut self, expected: &[u8; 4]) -> Result<()> {
        let offset = self.position();
        let actual = self.read_tag("section tag")?;
        if &actual != expected {
            return Err(FormatError::MalformedHeader {
                expected: *expected,
                actual,
                offset,
            });
        }
        Ok(())
    }

    pub fn peek_tag(&self) -> Option<[u8; 4]> {
        let start = self.position();
        let bytes = self.cursor.get_ref().get(start..start + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Consumes `tag` only when it is next in the stream.
    pub fn consume_tag_if(&mut self, tag: &[u8; 4]) -> bool {
        if self.peek_tag().as_ref() == Some(tag) {
            self.cursor.set_position((self.position() + 4) as u64);
            true
        } else {
            false
        }
    }

    fn truncated(&self, needed: usize, what: &'static str) -> FormatError {
        FormatError::TruncatedData {
            what,
            offset: self.position(),
            needed,
            available: self.remaining(),
        }
    }
}

/// Number of pixels in a `width` x `height` plane, rejecting products that
/// cannot be addressed.
pub(crate) fn plane_len(width: u32, height: u32, offset: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| FormatError::corrupt(offset, format!("{width}x{height} plane overflows")))
}
