//! Child-side emission of events on the process's own stdout.
//!
//! A supervised program calls [`send`] for every event. Anything else it
//! prints to stdout would corrupt the frame stream, so human-readable output
//! belongs on stderr.

use std::io::Write;

use serde::Serialize;

use crate::codec::FrameConfig;
use crate::error::Result;
use crate::writer::FrameWriter;

/// Serialize `message` and write it as one frame to stdout, then flush.
pub fn send<M: Serialize + ?Sized>(message: &M) -> Result<()> {
    send_with_config(message, &FrameConfig::default())
}

/// Same as [`send`] with an explicit frame configuration.
pub fn send_with_config<M: Serialize + ?Sized>(message: &M, config: &FrameConfig) -> Result<()> {
    let stdout = std::io::stdout();
    send_to(stdout.lock(), message, config)
}

/// Write one framed message to an arbitrary sink.
///
/// The sink is locked for the whole frame, so concurrent senders in the same
/// process cannot interleave header and payload bytes.
pub fn send_to<W: Write, M: Serialize + ?Sized>(
    sink: W,
    message: &M,
    config: &FrameConfig,
) -> Result<()> {
    let mut writer = FrameWriter::with_config(sink, config.clone());
    writer.send(message)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::message::Message;
    use crate::reader::FrameReader;

    #[test]
    fn send_to_writes_one_flushed_frame() {
        let mut sink = Vec::new();
        send_to(&mut sink, &Message::Int(42), &FrameConfig::default()).unwrap();
        send_to(&mut sink, &Message::Null, &FrameConfig::default()).unwrap();

        let mut reader = FrameReader::new(Cursor::new(sink));
        assert_eq!(reader.read_message::<Message>().unwrap(), Some(Message::Int(42)));
        assert_eq!(reader.read_message::<Message>().unwrap(), Some(Message::Null));
        assert_eq!(reader.read_message::<Message>().unwrap(), None);
    }

    #[test]
    fn send_to_honors_custom_magic() {
        let config = FrameConfig {
            magic: *b"TEST",
            ..FrameConfig::default()
        };
        let mut sink = Vec::new();
        send_to(&mut sink, &Message::Bool(true), &config).unwrap();

        assert_eq!(&sink[..4], b"TEST");
        let mut reader = FrameReader::with_config(Cursor::new(sink), config);
        assert_eq!(
            reader.read_message::<Message>().unwrap(),
            Some(Message::Bool(true))
        );
    }

    #[test]
    fn non_finite_float_is_rejected_before_writing() {
        let mut sink = Vec::new();
        let err = send_to(&mut sink, &Message::Float(f64::NAN), &FrameConfig::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::FrameError::Serialization(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn serialization_failure_propagates() {
        struct Unserializable;

        impl Serialize for Unserializable {
            fn serialize<S: serde::Serializer>(
                &self,
                _serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("refusing to serialize"))
            }
        }

        let mut sink = Vec::new();
        let err = send_to(&mut sink, &Unserializable, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, crate::error::FrameError::Serialization(_)));
        assert!(sink.is_empty());
    }
}
