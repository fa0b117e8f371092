use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig, HEADER_SIZE, MAGIC_SIZE};
use crate::error::FrameError;

/// `tokio_util` codec for the frame wire format.
///
/// Useful when a child's stdout is read as a `tokio::process::ChildStdout`
/// through `FramedRead`.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: FrameConfig,
}

impl FrameCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let received = src.len() as u64;
        let err = if src.len() < MAGIC_SIZE {
            FrameError::Truncated {
                stage: "magic",
                expected: MAGIC_SIZE as u64,
                received,
            }
        } else if src.len() < HEADER_SIZE {
            FrameError::Truncated {
                stage: "length",
                expected: HEADER_SIZE as u64,
                received,
            }
        } else {
            let mut length = [0u8; 8];
            length.copy_from_slice(&src[MAGIC_SIZE..HEADER_SIZE]);
            FrameError::Truncated {
                stage: "payload",
                expected: u64::from_le_bytes(length),
                received: received - HEADER_SIZE as u64,
            }
        };
        src.clear();
        Err(err)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item.payload.as_ref(), dst, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::encode_message;
    use crate::message::Message;

    #[tokio::test]
    async fn framed_write_then_read() {
        let mut sink = FramedWrite::new(Vec::new(), FrameCodec::default());
        sink.send(Frame::new(encode_message(&Message::Int(42)).unwrap()))
            .await
            .unwrap();
        sink.send(Frame::new(encode_message(&Message::from("next")).unwrap()))
            .await
            .unwrap();
        let wire = sink.into_inner();

        let mut stream = FramedRead::new(wire.as_slice(), FrameCodec::default());
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();

        assert_eq!(first.message::<Message>().unwrap(), Message::Int(42));
        assert_eq!(second.message::<Message>().unwrap(), Message::from("next"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_tail_is_a_violation() {
        let mut wire = BytesMut::new();
        encode_frame(b"complete", &mut wire, &FrameConfig::default()).unwrap();
        wire.truncate(HEADER_SIZE + 3);

        let mut stream = FramedRead::new(&wire[..], FrameCodec::default());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                stage: "payload",
                expected: 8,
                received: 3
            }
        ));
    }

    #[test]
    fn decode_eof_on_empty_buffer_is_clean() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
