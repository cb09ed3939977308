use thiserror::Error;

/// Failures produced while decoding a Real War asset buffer.
///
/// Decoding is all-or-nothing: any of these aborts the file being decoded and
/// no partially populated structure is handed back.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(
        "expected tag {} but found {} at offset {offset:#x}",
        fourcc(.expected),
        fourcc(.actual)
    )]
    MalformedHeader {
        expected: [u8; 4],
        actual: [u8; 4],
        offset: usize,
    },
    #[error(
        "{what} truncated at offset {offset:#x}: needed {needed} bytes, {available} available"
    )]
    TruncatedData {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error("corrupt data at offset {offset:#x}: {reason}")]
    CorruptData { offset: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, FormatError>;

impl FormatError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        FormatError::CorruptData {
            offset,
            reason: reason.into(),
        }
    }
}

/// Render a four-byte tag for diagnostics, escaping anything non-printable.
pub fn fourcc(tag: &[u8; 4]) -> String {
    let mut out = String::with_capacity(6);
    out.push('\'');
    for &byte in tag {
        if byte.is_ascii_graphic() || byte == b' ' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\x{byte:02x}"));
        }
    }
    out.push('\'');
    out
}
