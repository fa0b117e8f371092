use crate::stream::StreamId;

/// Errors that can occur while setting up or running a receiver manager.
///
/// Per-stream decode failures are not errors at this level; they arrive as
/// [`crate::Item::Violation`] through the stream's callback.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Spawning the child or checking its liveness failed.
    #[error("process error: {0}")]
    Process(#[from] pipewatch_process::ProcessError),

    /// A decoder thread could not be started.
    #[error("failed to start {stream} decoder thread: {source}")]
    DecoderThread {
        stream: StreamId,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
