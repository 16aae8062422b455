//! Length-prefixed framing
//!
//! Each frame is a 4-byte big-endian length followed by the payload. Used for
//! requests to the software-switch agent and by the bus bridge.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Write one frame using `buffer` as scratch space
pub async fn write_frame<W>(writer: &mut W, buffer: &mut BytesMut, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(data.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes does not fit a u32 length prefix", data.len()),
        )
    })?;

    // Single write call: prefix and payload together
    buffer.clear();
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(data);

    writer.write_all(buffer).await?;
    writer.flush().await?;

    debug!(bytes = data.len(), "Sent frame");
    Ok(())
}

/// Read one frame, rejecting frames larger than `max_size`
pub async fn read_frame<R>(reader: &mut R, buffer: &mut BytesMut, max_size: usize) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;

    let frame_len = u32::from_be_bytes(len_bytes) as usize;
    if frame_len > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame size {frame_len} exceeds maximum {max_size}"),
        ));
    }

    buffer.clear();
    buffer.resize(frame_len, 0);
    reader.read_exact(&mut buffer[..]).await?;

    debug!(bytes = frame_len, "Received frame");
    Ok(buffer.split_to(frame_len).freeze())
}
