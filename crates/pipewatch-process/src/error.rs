/// Errors that can occur while starting or inspecting a child process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The argument vector was empty.
    #[error("empty command line (expected a program and optional arguments)")]
    EmptyCommand,

    /// The child process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A captured output pipe was already taken or never created.
    #[error("child {0} pipe is not available")]
    MissingPipe(&'static str),

    /// An I/O error occurred while inspecting or signalling the child.
    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
