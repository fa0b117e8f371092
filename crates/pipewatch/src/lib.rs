//! Supervise a child process and receive its events.
//!
//! pipewatch spawns a command, decodes length-prefixed structured events from
//! its stdout and text lines from its stderr on dedicated threads, and hands
//! both to the caller from a single polling thread, followed by exactly one
//! exit notification.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire format, `Message` value model, child-side `send`
//! - [`process`]: child spawning with captured pipes
//! - [`receiver`]: stream decoders, receivers and the polling `ReceiverManager`

/// Re-export frame types.
pub mod frame {
    pub use pipewatch_frame::*;
}

/// Re-export process types.
pub mod process {
    pub use pipewatch_process::*;
}

/// Re-export receiver types.
pub mod receiver {
    pub use pipewatch_receiver::*;
}

pub use pipewatch_frame::{send, Message};
pub use pipewatch_receiver::{monitor, monitor_with_config, Item, ManagerConfig, StreamId};
