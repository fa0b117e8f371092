//! Child process spawning for pipewatch.
//!
//! This is the lowest layer: it starts the supervised program with its
//! stdout and stderr captured as byte pipes and answers the liveness check.
//! Everything else builds on the [`ChildProcess`] type provided here.

pub mod child;
pub mod error;

pub use child::ChildProcess;
pub use error::{ProcessError, Result};
