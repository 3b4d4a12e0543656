//! Netstring framing (`<len>:<bytes>,`).
//!
//! Used twice: inside a broker message for the header and body blocks, and
//! as the outer frame when broker messages travel over a TCP stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest length prefix accepted, in digits.
const MAX_PREFIX_DIGITS: usize = 10;

/// Errors produced while decoding netstrings and broker messages.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("netstring length prefix is missing or malformed")]
    BadLength,

    #[error("netstring truncated: expected {expected} bytes, {available} available")]
    Truncated { expected: usize, available: usize },

    #[error("netstring did not end in ','")]
    MissingTerminator,

    #[error("netstring of {0} bytes exceeds the frame limit")]
    TooLarge(usize),

    #[error("broker message is missing the {0} field")]
    MissingField(&'static str),

    #[error("broker headers are not a JSON object: {0}")]
    Headers(#[from] serde_json::Error),

    #[error("broker message field is not valid UTF-8")]
    Utf8,

    #[error("I/O error while reading frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Split one netstring off the front of `input`, returning `(payload, rest)`.
pub fn parse_netstring(input: &[u8]) -> Result<(&[u8], &[u8]), ParseError> {
    let colon = input
        .iter()
        .take(MAX_PREFIX_DIGITS + 1)
        .position(|b| *b == b':')
        .ok_or(ParseError::BadLength)?;
    let len = parse_len(&input[..colon])?;

    let rest = &input[colon + 1..];
    if rest.len() < len + 1 {
        return Err(ParseError::Truncated {
            expected: len + 1,
            available: rest.len(),
        });
    }
    if rest[len] != b',' {
        return Err(ParseError::MissingTerminator);
    }
    Ok((&rest[..len], &rest[len + 1..]))
}

/// Encode `payload` as a netstring.
pub fn encode_netstring(payload: &[u8]) -> Vec<u8> {
    let prefix = payload.len().to_string();
    let mut out = Vec::with_capacity(prefix.len() + payload.len() + 2);
    out.extend_from_slice(prefix.as_bytes());
    out.push(b':');
    out.extend_from_slice(payload);
    out.push(b',');
    out
}

fn parse_len(digits: &[u8]) -> Result<usize, ParseError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::BadLength);
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ParseError::BadLength)
}

/// Read one netstring frame from a stream.
///
/// Returns `Ok(None)` on a clean end of stream before any prefix byte.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut digits = Vec::with_capacity(MAX_PREFIX_DIGITS);
    loop {
        let byte = match reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && digits.is_empty() => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match byte {
            b':' => break,
            b'0'..=b'9' if digits.len() < MAX_PREFIX_DIGITS => digits.push(byte),
            // tolerate whitespace between frames
            b'\r' | b'\n' | b' ' if digits.is_empty() => continue,
            _ => return Err(ParseError::BadLength),
        }
    }

    let len = parse_len(&digits)?;
    if len > max_len {
        return Err(ParseError::TooLarge(len));
    }

    let mut payload = vec![0u8; len + 1];
    reader.read_exact(&mut payload).await?;
    if payload.pop() != Some(b',') {
        return Err(ParseError::MissingTerminator);
    }
    Ok(Some(payload))
}

/// Write `payload` to a stream as one netstring frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_netstring(payload)).await?;
    writer.flush().await
}
