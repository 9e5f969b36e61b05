//! Module `frame`
//!
//! Length-prefixed text frames: a 2-byte big-endian payload length followed
//! by that many bytes of UTF-8. One frame carries exactly one message.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Width of the length prefix in bytes.
pub const PREFIX_LEN: usize = 2;

/// Largest payload the prefix can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Returns true if `text` can be carried by one frame.
pub fn fits_frame(text: &str) -> bool {
    text.len() <= MAX_PAYLOAD_LEN
}

/// Encodes `text` as a single frame.
pub fn encode(text: &str) -> Result<Vec<u8>, FrameError> {
    let payload = text.as_bytes();
    let len = u16::try_from(payload.len())
        .map_err(|_| FrameError::FrameTooLarge { len: payload.len() })?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before the first byte of a
/// new frame. Ending anywhere after that is a `TruncatedStream` fault.
pub async fn decode<R>(reader: &mut R) -> Result<Option<String>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    match read_fully(reader, &mut prefix).await? {
        0 => return Ok(None),
        PREFIX_LEN => {}
        _ => return Err(FrameError::TruncatedStream),
    }

    let len = u16::from_be_bytes(prefix) as usize;
    let mut payload = vec![0u8; len];
    if read_fully(reader, &mut payload).await? != len {
        return Err(FrameError::TruncatedStream);
    }

    String::from_utf8(payload)
        .map(Some)
        .map_err(|_| FrameError::InvalidUtf8)
}

/// Encodes `text`, writes the whole frame and flushes.
pub async fn write_frame<W>(writer: &mut W, text: &str) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(text)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Fills `buf` unless the stream ends first; returns how many bytes were read.
async fn read_fully<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
