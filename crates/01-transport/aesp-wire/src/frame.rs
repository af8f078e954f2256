use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FrameError;
use crate::message_type::MessageType;

pub const MAGIC: [u8; 2] = [0xAE, 0x50];
pub const VERSION: u8 = 1;
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;
pub const HEADER_LEN: usize = 8;

/// A decoded AESP frame: a message type paired with its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageType,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Encodes a message into a ready-to-write frame. Total for any payload
/// under [`MAX_PAYLOAD`]; callers that exceed the limit get a frame whose
/// length field simply reflects the oversize payload, since encoding never
/// fails by contract (see `decode` for the corresponding `LengthExceeded`).
pub fn encode(kind: MessageType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_slice(&MAGIC);
    buf.put_u8(VERSION);
    buf.put_u8(kind.as_u8());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Reads and validates one frame's 8-byte header, then its payload.
///
/// Validates magic, version, and length before allocating the payload
/// buffer: a hostile or corrupt length field never triggers an
/// allocation larger than [`MAX_PAYLOAD`].
pub async fn decode<R>(reader: &mut R) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    read_exact_or_truncated(reader, &mut header).await?;

    if header[0..2] != MAGIC {
        return Err(FrameError::BadMagic);
    }
    let version = header[2];
    if version != VERSION {
        return Err(FrameError::BadVersion(version));
    }
    let type_byte = header[3];
    let kind = MessageType::try_from(type_byte)?;
    let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if length as usize > MAX_PAYLOAD {
        return Err(FrameError::LengthExceeded(length, MAX_PAYLOAD));
    }

    let mut payload = vec![0u8; length as usize];
    read_exact_or_truncated(reader, &mut payload).await?;

    Ok(Frame {
        kind,
        payload: Bytes::from(payload),
    })
}

async fn read_exact_or_truncated<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    reader
        .read_exact(buf)
        .await
        .map_err(|_| FrameError::Truncated)?;
    Ok(())
}
