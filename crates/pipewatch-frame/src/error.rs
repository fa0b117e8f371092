/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header does not start with the configured magic bytes.
    #[error("invalid frame magic (expected {expected:02X?}, found {found:02X?})")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: usize },

    /// The stream ended after a frame had begun but before it was complete.
    #[error("stream closed mid-frame while reading {stage} ({received} of {expected} bytes)")]
    Truncated {
        stage: &'static str,
        expected: u64,
        received: u64,
    },

    /// The payload could not be encoded or decoded as a message.
    #[error("message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for errors caused by malformed bytes on the wire.
    ///
    /// A clean end-of-stream at a frame boundary is never an error, so it
    /// never shows up here.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidMagic { .. }
                | FrameError::PayloadTooLarge { .. }
                | FrameError::Truncated { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
