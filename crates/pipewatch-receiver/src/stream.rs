use std::fmt;

use pipewatch_frame::FrameError;

/// One of the two monitored child output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    /// stdout, carrying framed structured events.
    Primary,
    /// stderr, carrying free-text diagnostic lines.
    Secondary,
}

impl StreamId {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamId::Primary => "primary",
            StreamId::Secondary => "secondary",
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that stopped a stream decoder.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Malformed or truncated frame, or an undecodable payload.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Reading the pipe failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True when the bytes on the wire broke the framing rules.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::Frame(err) if err.is_protocol_violation())
    }
}

/// One entry of a receiver's queue, handed to the stream's callback.
///
/// Exactly one terminal entry (`Violation` or `EndOfStream`) is produced
/// per stream, and it is always the last one.
#[derive(Debug)]
pub enum Item<V> {
    /// A decoded event (primary) or text line (secondary).
    Value(V),
    /// The decoder hit an error and stopped; nothing follows on this stream.
    Violation { stream: StreamId, error: StreamError },
    /// The pipe reached end-of-file at a unit boundary.
    EndOfStream(StreamId),
}

impl<V> Item<V> {
    /// True for the entry that ends a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Item::Value(_))
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Item::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Item::Value(value) => Some(value),
            _ => None,
        }
    }

    /// True when this is the clean end-of-stream sentinel for `stream`.
    pub fn is_end_of(&self, stream: StreamId) -> bool {
        matches!(self, Item::EndOfStream(id) if *id == stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ids_render_as_names() {
        assert_eq!(StreamId::Primary.to_string(), "primary");
        assert_eq!(StreamId::Secondary.as_str(), "secondary");
    }

    #[test]
    fn terminal_items() {
        let value: Item<i64> = Item::Value(1);
        let end: Item<i64> = Item::EndOfStream(StreamId::Primary);
        let violation: Item<i64> = Item::Violation {
            stream: StreamId::Primary,
            error: StreamError::Io(std::io::Error::other("boom")),
        };

        assert!(!value.is_terminal());
        assert!(end.is_terminal());
        assert!(violation.is_terminal());
        assert!(end.is_end_of(StreamId::Primary));
        assert!(!end.is_end_of(StreamId::Secondary));
        assert_eq!(value.into_value(), Some(1));
    }

    #[test]
    fn truncation_is_a_protocol_violation() {
        let err = StreamError::from(FrameError::Truncated {
            stage: "payload",
            expected: 16,
            received: 3,
        });
        assert!(err.is_protocol_violation());
        assert!(!StreamError::Io(std::io::Error::other("x")).is_protocol_violation());
    }
}
