//! Length-prefixed CBOR framing.
//!
//! Synchronous [`encode`]/[`decode`] work on buffers; [`read_frame`] and
//! [`write_frame`] drive any tokio byte stream.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{FrameError, TransportError};

/// Size of the big-endian `u32` length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default upper bound on a frame body (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 20;

/// Append one frame (prefix + CBOR body) to `buf`.
pub fn encode<T: Serialize>(value: &T, buf: &mut Vec<u8>, max: usize) -> Result<(), FrameError> {
    let mut body = Vec::new();
    ciborium::into_writer(value, &mut body)
        .map_err(|e| FrameError::Encode { reason: e.to_string() })?;

    if body.len() > max {
        return Err(FrameError::TooLarge { size: body.len(), max });
    }
    let len = u32::try_from(body.len())
        .map_err(|_| FrameError::TooLarge { size: body.len(), max })?;

    buf.reserve(LENGTH_PREFIX_SIZE + body.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(())
}

/// Decode one complete frame from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode<T: DeserializeOwned>(buf: &[u8], max: usize) -> Result<(T, usize), FrameError> {
    let Some(prefix) = buf.get(..LENGTH_PREFIX_SIZE) else {
        return Err(FrameError::Truncated { expected: LENGTH_PREFIX_SIZE, actual: buf.len() });
    };
    let len = body_len(prefix, max)?;

    let end = LENGTH_PREFIX_SIZE + len;
    let Some(body) = buf.get(LENGTH_PREFIX_SIZE..end) else {
        return Err(FrameError::Truncated { expected: end, actual: buf.len() });
    };

    let value = ciborium::from_reader(body).map_err(|e| FrameError::Decode { reason: e.to_string() })?;
    Ok((value, end))
}

/// Read one frame from `reader`.
///
/// Returns `Ok(None)` on a clean end of stream before the first prefix byte.
/// A stream ending anywhere after that byte is a truncated frame.
pub async fn read_frame<R, T>(reader: &mut R, max: usize) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    if reader.read(&mut prefix[..1]).await? == 0 {
        return Ok(None);
    }
    if let Err(e) = reader.read_exact(&mut prefix[1..]).await {
        return Err(truncated(e, LENGTH_PREFIX_SIZE));
    }

    let len = body_len(&prefix, max)?;
    let mut body = vec![0u8; len];
    if let Err(e) = reader.read_exact(&mut body).await {
        return Err(truncated(e, LENGTH_PREFIX_SIZE + len));
    }

    let value =
        ciborium::from_reader(body.as_slice()).map_err(|e| FrameError::Decode { reason: e.to_string() })?;
    Ok(Some(value))
}

/// Write one frame to `writer` and flush.
pub async fn write_frame<W, T>(writer: &mut W, value: &T, max: usize) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Serialize,
{
    let mut buf = Vec::new();
    encode(value, &mut buf, max)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

// Early EOF inside a frame. The byte count actually read is not recoverable
// from `read_exact`, so `actual` is zero.
fn truncated(e: std::io::Error, expected: usize) -> TransportError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Truncated { expected, actual: 0 }.into()
    } else {
        e.into()
    }
}

fn body_len(prefix: &[u8], max: usize) -> Result<usize, FrameError> {
    let mut bytes = [0u8; LENGTH_PREFIX_SIZE];
    bytes.copy_from_slice(prefix);
    let len = usize::try_from(u32::from_be_bytes(bytes)).unwrap_or(usize::MAX);
    if len > max {
        return Err(FrameError::TooLarge { size: len, max });
    }
    Ok(len)
}
