use std::ffi::OsStr;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{ProcessError, Result};

/// A spawned child with its stdout and stderr captured as byte pipes.
///
/// stdin is attached to the null device; nothing here ever writes to the
/// child. The liveness check ([`ChildProcess::try_wait`]) never blocks.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    program: String,
}

impl ChildProcess {
    /// Spawn `argv[0]` with the remaining elements as arguments.
    pub fn spawn<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut argv = argv.into_iter();
        let program = argv.next().ok_or(ProcessError::EmptyCommand)?;
        let program_name = program.as_ref().to_string_lossy().into_owned();

        let mut cmd = Command::new(program.as_ref());
        cmd.args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: program_name.clone(),
            source,
        })?;
        debug!(program = %program_name, pid = child.id(), "spawned child process");

        Ok(Self {
            child,
            program: program_name,
        })
    }

    /// Take ownership of the stdout pipe.
    ///
    /// This can only be called once; subsequent calls return `MissingPipe`.
    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or(ProcessError::MissingPipe("stdout"))
    }

    /// Take ownership of the stderr pipe.
    ///
    /// This can only be called once; subsequent calls return `MissingPipe`.
    pub fn take_stderr(&mut self) -> Result<ChildStderr> {
        self.child
            .stderr
            .take()
            .ok_or(ProcessError::MissingPipe("stderr"))
    }

    /// Check whether the child has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the child exits.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Forcefully terminate the child.
    pub fn kill(&mut self) -> Result<()> {
        debug!(pid = self.child.id(), "killing child process");
        Ok(self.child.kill()?)
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Program name as given in `argv[0]`.
    pub fn program(&self) -> &str {
        &self.program
    }
}
