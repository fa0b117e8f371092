use std::ffi::OsStr;
use std::process::ExitStatus;
use std::thread;
use std::time::Duration;

use pipewatch_frame::{FrameConfig, Message};
use pipewatch_process::ChildProcess;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::decoder::{FrameDecoder, LineDecoder};
use crate::error::Result;
use crate::receiver::Receiver;
use crate::stream::{Item, StreamId};

/// How long a dropped manager waits for each decoder after killing the child.
const DROP_GRACE: Duration = Duration::from_secs(1);

/// Callback for items of the primary (framed event) stream.
pub type EventHandler<'a, T> = Box<dyn FnMut(Item<T>) + 'a>;
/// Callback for items of the secondary (text line) stream.
pub type LineHandler<'a> = Box<dyn FnMut(Item<String>) + 'a>;
/// Callback invoked once the child has exited.
pub type ExitHandler<'a> = Box<dyn FnOnce(ExitStatus) + 'a>;

/// Configuration for a receiver manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Wait between successive drain/liveness cycles. Default: 100 ms.
    pub poll_interval: Duration,
    /// Bound on the final drain after the child exits, applied per stream.
    ///
    /// `None` (the default) waits for both end-of-stream sentinels. A
    /// grandchild that inherited the pipes can hold that wait open
    /// indefinitely; set a bound when that matters.
    pub final_drain_timeout: Option<Duration>,
    /// Frame codec settings for the primary stream.
    pub frame: FrameConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            final_drain_timeout: None,
            frame: FrameConfig::default(),
        }
    }
}

/// Supervises one child process and both of its output streams.
///
/// All callbacks run on the thread that drives the manager ([`run`] or
/// [`tick`]), primary before secondary within each cycle, so they need not
/// be thread-safe.
///
/// [`run`]: ReceiverManager::run
/// [`tick`]: ReceiverManager::tick
pub struct ReceiverManager<'a, T = Message> {
    child: ChildProcess,
    primary: Receiver<T>,
    secondary: Receiver<String>,
    config: ManagerConfig,
    on_event: EventHandler<'a, T>,
    on_line: LineHandler<'a>,
    on_exit: Option<ExitHandler<'a>>,
    exit_status: Option<ExitStatus>,
}

impl<'a, T> ReceiverManager<'a, T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Spawn `argv` and start decoding its stdout and stderr.
    ///
    /// A spawn failure is returned before any decoder exists. Nothing is
    /// delivered until the manager is driven with [`run`](Self::run) or
    /// [`tick`](Self::tick).
    pub fn spawn<I, S, E, L, X>(
        argv: I,
        config: ManagerConfig,
        on_event: E,
        on_line: L,
        on_exit: X,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
        E: FnMut(Item<T>) + 'a,
        L: FnMut(Item<String>) + 'a,
        X: FnOnce(ExitStatus) + 'a,
    {
        let mut child = ChildProcess::spawn(argv)?;
        let (primary, secondary) = match start_receivers(&mut child, &config.frame) {
            Ok(receivers) => receivers,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };

        Ok(Self {
            child,
            primary,
            secondary,
            config,
            on_event: Box::new(on_event),
            on_line: Box::new(on_line),
            on_exit: Some(Box::new(on_exit)),
            exit_status: None,
        })
    }
}

impl<'a, T> ReceiverManager<'a, T> {
    /// One poll cycle: drain primary, drain secondary, check liveness.
    ///
    /// Returns the exit status once the child has exited. Does not run the
    /// final drain or the exit callback; [`run`](Self::run) does.
    pub fn tick(&mut self) -> Result<Option<ExitStatus>> {
        self.primary.drain(&mut *self.on_event);
        self.secondary.drain(&mut *self.on_line);

        let status = self.child.try_wait()?;
        if let Some(status) = status {
            if self.exit_status.is_none() {
                debug!(pid = self.child.id(), %status, "child exited");
            }
            self.exit_status = Some(status);
        }
        Ok(status)
    }

    /// Poll until the child exits, then deliver everything that is left and
    /// invoke the exit callback exactly once.
    ///
    /// After exit, primary and then secondary are drained up to and
    /// including their terminal items (bounded by
    /// [`ManagerConfig::final_drain_timeout`]) before the exit callback
    /// runs. A failed liveness check is returned as an error and the exit
    /// callback is not invoked.
    pub fn run(mut self) -> Result<ExitStatus> {
        let status = loop {
            thread::sleep(self.config.poll_interval);
            if let Some(status) = self.tick()? {
                break status;
            }
        };

        self.finish(status);
        Ok(status)
    }

    fn finish(&mut self, status: ExitStatus) {
        let timeout = self.config.final_drain_timeout;
        if !self.primary.drain_until_end(&mut *self.on_event, timeout) {
            warn!(stream = %StreamId::Primary, "final drain stopped before end of stream");
        }
        if !self.secondary.drain_until_end(&mut *self.on_line, timeout) {
            warn!(stream = %StreamId::Secondary, "final drain stopped before end of stream");
        }
        self.primary.join();
        self.secondary.join();

        if let Some(on_exit) = self.on_exit.take() {
            on_exit(status);
        }
    }

    /// OS process id of the child.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status, once a liveness check has observed it.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}

impl<T> Drop for ReceiverManager<'_, T> {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        // Dropped while the child may still run: stop it so both decoders see
        // end-of-file and can be joined. Callbacks are not invoked.
        if let Ok(None) = self.child.try_wait() {
            debug!(pid = self.child.id(), "manager dropped before child exit");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        self.primary.shutdown(DROP_GRACE);
        self.secondary.shutdown(DROP_GRACE);
    }
}

fn start_receivers<T>(
    child: &mut ChildProcess,
    frame: &FrameConfig,
) -> Result<(Receiver<T>, Receiver<String>)>
where
    T: DeserializeOwned + Send + 'static,
{
    let stdout = child.take_stdout()?;
    let stderr = child.take_stderr()?;
    let primary = Receiver::spawn(
        StreamId::Primary,
        FrameDecoder::<_, T>::with_config(stdout, frame.clone()),
    )?;
    let secondary = Receiver::spawn(StreamId::Secondary, LineDecoder::new(stderr))?;
    Ok((primary, secondary))
}

/// Spawn `argv`, supervise it with default configuration until it exits.
///
/// `on_event` receives each decoded [`Message`] from stdout, `on_line` each
/// stderr line, and `on_exit` is called exactly once after both streams
/// have delivered their final item.
pub fn monitor<'a, I, S, E, L, X>(
    argv: I,
    on_event: E,
    on_line: L,
    on_exit: X,
) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: FnMut(Item<Message>) + 'a,
    L: FnMut(Item<String>) + 'a,
    X: FnOnce(ExitStatus) + 'a,
{
    monitor_with_config(argv, ManagerConfig::default(), on_event, on_line, on_exit)
}

/// Spawn and supervise with explicit configuration and event type.
pub fn monitor_with_config<'a, T, I, S, E, L, X>(
    argv: I,
    config: ManagerConfig,
    on_event: E,
    on_line: L,
    on_exit: X,
) -> Result<ExitStatus>
where
    T: DeserializeOwned + Send + 'static,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: FnMut(Item<T>) + 'a,
    L: FnMut(Item<String>) + 'a,
    X: FnOnce(ExitStatus) + 'a,
{
    ReceiverManager::spawn(argv, config, on_event, on_line, on_exit)?.run()
}
