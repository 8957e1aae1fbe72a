use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// number of ASCII decimal digits that prefix the header body
pub const LENGTH_PREFIX_LEN: usize = 4;
/// the largest header body length that fits into the length prefix
pub const MAX_HEADER_LEN: usize = 9999;
pub const FILLER_BYTE: u8 = b'1';

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("length prefix is not four decimal digits: {0:?}")]
    InvalidLengthPrefix(String),
    #[error("length prefix announces {declared} header bytes, but only {available} follow")]
    LengthExceedsFrame { declared: usize, available: usize },
    #[error("header body is not a valid control header: {0}")]
    InvalidHeader(#[from] serde_json::Error),
    #[error("header needs {required} bytes, which does not fit into an MTU of {mtu}")]
    HeaderExceedsMtu { required: usize, mtu: usize },
    #[error("header body of {0} bytes does not fit into the length prefix")]
    HeaderTooLong(usize),
}

/// The control header at the start of every frame. The field names on the wire are fixed, both
///  peers have to agree on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlHeader {
    /// wall clock second the frame was created in, `YYYYMMDDHHMMSS`
    #[serde(rename = "DatetimeKey")]
    pub bucket_key: String,
    #[serde(rename = "IsFirst")]
    pub is_first: bool,
    #[serde(rename = "IsEnd")]
    pub is_end: bool,
    /// only meaningful if `is_end` is set
    #[serde(rename = "TotalSentCount")]
    pub total_sent_count: u64,
}

impl ControlHeader {
    pub fn data(bucket_key: impl Into<String>, is_first: bool) -> ControlHeader {
        ControlHeader {
            bucket_key: bucket_key.into(),
            is_first,
            is_end: false,
            total_sent_count: 0,
        }
    }

    pub fn end_marker(bucket_key: impl Into<String>, total_sent_count: u64) -> ControlHeader {
        ControlHeader {
            bucket_key: bucket_key.into(),
            is_first: false,
            is_end: true,
            total_sent_count,
        }
    }
}

/// Returns the number of bytes the length prefix and the serialized header occupy, i.e. the
///  smallest MTU that can carry this header.
pub fn encoded_header_len(header: &ControlHeader) -> Result<usize, FrameError> {
    Ok(LENGTH_PREFIX_LEN + serde_json::to_vec(header)?.len())
}

/// Encodes a frame of exactly `mtu` bytes: length prefix, header body and filler.
///
/// A header that does not fit is an error rather than being truncated - a truncated header would
///  be unreadable on the receiving side.
pub fn encode(header: &ControlHeader, mtu: usize) -> Result<BytesMut, FrameError> {
    let body = serde_json::to_vec(header)?;
    if body.len() > MAX_HEADER_LEN {
        return Err(FrameError::HeaderTooLong(body.len()));
    }

    let required = LENGTH_PREFIX_LEN + body.len();
    if required > mtu {
        return Err(FrameError::HeaderExceedsMtu { required, mtu });
    }

    let mut buf = BytesMut::with_capacity(mtu);
    buf.put_slice(format!("{:04}", body.len()).as_bytes());
    buf.put_slice(&body);
    buf.put_bytes(FILLER_BYTE, mtu - required);
    Ok(buf)
}

/// Decodes the control header of a received frame, ignoring the filler after it.
pub fn decode(buf: &[u8]) -> Result<ControlHeader, FrameError> {
    if buf.len() < LENGTH_PREFIX_LEN {
        return Err(FrameError::InvalidLengthPrefix(String::from_utf8_lossy(buf).into_owned()));
    }

    let (prefix, rest) = buf.split_at(LENGTH_PREFIX_LEN);
    if !prefix.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::InvalidLengthPrefix(String::from_utf8_lossy(prefix).into_owned()));
    }

    let declared = prefix.iter()
        .fold(0usize, |acc, digit| acc * 10 + usize::from(digit - b'0'));
    if declared > rest.len() {
        return Err(FrameError::LengthExceedsFrame { declared, available: rest.len() });
    }

    Ok(serde_json::from_slice(&rest[..declared])?)
}
