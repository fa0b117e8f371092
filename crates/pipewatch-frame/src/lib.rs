//! Magic-marked, length-prefixed message framing for a child's stdout.
//!
//! Every message is framed with:
//! - A 4-byte magic marker (`BA DE AF FE` by default) at each frame start
//! - An 8-byte little-endian payload length
//! - The payload: one serde_json-encoded message
//!
//! Reading distinguishes a clean end-of-stream at a frame boundary from a
//! stream that closes mid-frame. No partial reads, no buffer management in
//! user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod sender;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
pub use codec::{
    decode_frame, decode_message, encode_frame, encode_message, Frame, FrameConfig,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Result};
pub use message::Message;
pub use reader::FrameReader;
pub use sender::{send, send_to, send_with_config};
pub use writer::FrameWriter;
