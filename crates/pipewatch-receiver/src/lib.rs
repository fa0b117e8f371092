//! Child process supervision with two output streams.
//!
//! A [`ReceiverManager`] spawns a child and reads its stdout as framed
//! structured events and its stderr as text lines, each on a dedicated
//! decoder thread. The owning thread polls: it drains both queues without
//! blocking, checks whether the child is still alive, and once it has
//! exited delivers the remaining items and reports the exit status exactly
//! once.
//!
//! ```no_run
//! use pipewatch_receiver::{monitor, Item};
//!
//! let status = monitor(
//!     ["my-worker", "--fast"],
//!     |item| {
//!         if let Item::Value(event) = item {
//!             println!("event: {event:?}");
//!         }
//!     },
//!     |item| {
//!         if let Item::Value(line) = item {
//!             eprintln!("worker: {line}");
//!         }
//!     },
//!     |status| println!("worker exited: {status}"),
//! )?;
//! # let _ = status;
//! # Ok::<(), pipewatch_receiver::ReceiverError>(())
//! ```

pub mod decoder;
pub mod error;
pub mod manager;
pub mod receiver;
pub mod stream;

pub use decoder::{FrameDecoder, LineDecoder, StreamDecoder};
pub use error::{ReceiverError, Result};
pub use manager::{
    monitor, monitor_with_config, EventHandler, ExitHandler, LineHandler, ManagerConfig,
    ReceiverManager,
};
pub use receiver::Receiver;
pub use stream::{Item, StreamError, StreamId};
