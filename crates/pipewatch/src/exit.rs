use std::fmt;
use std::io;
use std::process::ExitStatus;

use pipewatch_frame::FrameError;
use pipewatch_process::ProcessError;
use pipewatch_receiver::ReceiverError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
/// Command found but not executable (shell convention).
pub const CANNOT_EXECUTE: i32 = 126;
/// Command not found (shell convention).
pub const NOT_FOUND: i32 = 127;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::Serialization(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn process_error(context: &str, err: ProcessError) -> CliError {
    match err {
        ProcessError::EmptyCommand => CliError::new(USAGE, format!("{context}: {err}")),
        ProcessError::Spawn { ref source, .. } => {
            let code = match source.kind() {
                io::ErrorKind::NotFound => NOT_FOUND,
                io::ErrorKind::PermissionDenied => CANNOT_EXECUTE,
                _ => INTERNAL,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        ProcessError::Io(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn receiver_error(context: &str, err: ReceiverError) -> CliError {
    match err {
        ReceiverError::Process(err) => process_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

/// Exit code to report for a finished child.
///
/// A child killed by a signal has no code of its own; that maps to
/// `FAILURE`.
pub fn child_exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(FAILURE)
}
