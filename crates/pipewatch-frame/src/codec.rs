use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FrameError, Result};

/// Size of the magic marker at the start of every frame.
pub const MAGIC_SIZE: usize = 4;

/// Size of the payload length field.
pub const LENGTH_SIZE: usize = 8;

/// Frame header: magic (4) + length (8) = 12 bytes.
pub const HEADER_SIZE: usize = MAGIC_SIZE + LENGTH_SIZE;

/// Default magic bytes: 0xBA 0xDE 0xAF 0xFE.
pub const MAGIC: [u8; MAGIC_SIZE] = [0xBA, 0xDE, 0xAF, 0xFE];

/// Default maximum payload size: 64 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// One framed payload read from the primary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The serialized message bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Deserialize the payload as a message.
    pub fn message<M: DeserializeOwned>(&self) -> Result<M> {
        decode_message(self.payload.as_ref())
    }
}

/// Configuration for the frame codec.
///
/// Both ends of a pipe must agree on `magic`. `max_payload_size` only bounds
/// what a reader is willing to allocate for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Marker expected at the start of every frame.
    pub magic: [u8; MAGIC_SIZE],
    /// Maximum payload size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl FrameConfig {
    /// Validate a declared payload length against the configured maximum.
    pub(crate) fn check_length(&self, len: u64) -> Result<usize> {
        match usize::try_from(len) {
            Ok(size) if size <= self.max_payload_size => Ok(size),
            _ => Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_payload_size,
            }),
        }
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬─────────────────┐
/// │ Magic (4B)   │ Length       │ Payload         │
/// │ BA DE AF FE  │ (8B u64 LE)  │ (Length bytes)  │
/// └──────────────┴──────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut, config: &FrameConfig) -> Result<()> {
    if payload.len() > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len() as u64,
            max: config.max_payload_size,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&config.magic);
    dst.put_u64_le(payload.len() as u64);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    if src.len() >= MAGIC_SIZE {
        let found: [u8; MAGIC_SIZE] = [src[0], src[1], src[2], src[3]];
        if found != config.magic {
            return Err(FrameError::InvalidMagic {
                expected: config.magic,
                found,
            });
        }
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let mut length = [0u8; LENGTH_SIZE];
    length.copy_from_slice(&src[MAGIC_SIZE..HEADER_SIZE]);
    let payload_len = config.check_length(u64::from_le_bytes(length))?;

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { payload }))
}

/// Serialize a message into frame payload bytes.
pub fn encode_message<M: Serialize + ?Sized>(message: &M) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(message)?))
}

/// Deserialize a message from frame payload bytes.
pub fn decode_message<M: DeserializeOwned>(payload: &[u8]) -> Result<M> {
    Ok(serde_json::from_slice(payload)?)
}
