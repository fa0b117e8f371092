use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Spawn a command and print the events and lines it produces.
    Watch(WatchArgs),
    /// Emit frames on stdout and lines on stderr (child side).
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Wait between drain cycles (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms", env = "PIPEWATCH_POLL_INTERVAL")]
    pub poll_interval: String,
    /// Bound on the final drain after the child exits. Default: wait for
    /// both streams to close.
    #[arg(long, value_name = "DURATION")]
    pub final_drain_timeout: Option<String>,
    /// Largest accepted frame payload in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
    /// Program to run, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// JSON value to send as one event (repeatable).
    #[arg(long, value_name = "JSON")]
    pub json: Vec<String>,
    /// String to send as one text event (repeatable).
    #[arg(long, value_name = "TEXT")]
    pub text: Vec<String>,
    /// Line to write to stderr after all events (repeatable).
    #[arg(long, value_name = "LINE")]
    pub line: Vec<String>,
    /// Exit code to finish with.
    #[arg(long, default_value = "0")]
    pub exit_code: i32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
