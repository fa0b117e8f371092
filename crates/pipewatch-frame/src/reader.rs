use std::io::{ErrorKind, Read};

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::codec::{Frame, FrameConfig, LENGTH_SIZE, MAGIC_SIZE};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Each call consumes exactly one frame and nothing more; there is no
/// read-ahead buffer, so the stream position always sits on a frame boundary
/// between calls. Partial reads are handled internally.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` when the stream ends cleanly at a frame boundary.
    /// Running out of bytes anywhere after the first magic byte is a
    /// [`FrameError::Truncated`] protocol violation.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut magic = [0u8; MAGIC_SIZE];
        let received = read_full(&mut self.inner, &mut magic)?;
        if received == 0 {
            return Ok(None);
        }
        if received < MAGIC_SIZE {
            return Err(truncated("magic", MAGIC_SIZE, received));
        }
        if magic != self.config.magic {
            return Err(FrameError::InvalidMagic {
                expected: self.config.magic,
                found: magic,
            });
        }

        let mut length = [0u8; LENGTH_SIZE];
        let received = read_full(&mut self.inner, &mut length)?;
        if received < LENGTH_SIZE {
            return Err(truncated("length", LENGTH_SIZE, received));
        }
        let payload_len = self.config.check_length(u64::from_le_bytes(length))?;

        let mut payload = vec![0u8; payload_len];
        let received = read_full(&mut self.inner, &mut payload)?;
        if received < payload_len {
            return Err(truncated("payload", payload_len, received));
        }

        trace!(len = payload_len, "frame read");
        Ok(Some(Frame::new(payload)))
    }

    /// Read the next frame and deserialize its payload.
    pub fn read_message<M: DeserializeOwned>(&mut self) -> Result<Option<M>> {
        self.read_frame()?.map(|frame| frame.message()).transpose()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Fill `buf` from `inner`, stopping early only at end-of-stream.
///
/// Returns the number of bytes actually read.
fn read_full<R: Read>(inner: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(filled)
}

fn truncated(stage: &'static str, expected: usize, received: usize) -> FrameError {
    FrameError::Truncated {
        stage,
        expected: expected as u64,
        received: received as u64,
    }
}
