mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "pipewatch",
    version,
    about = "Supervise a child process and receive its framed events"
)]
struct Cli {
    /// Output format for watch records.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "PIPEWATCH_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "pipewatch",
            "watch",
            "--poll-interval",
            "50ms",
            "--",
            "worker",
            "--verbose",
            "-n",
            "3",
        ])
        .expect("watch args should parse");

        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.poll_interval, "50ms");
                assert_eq!(args.command, vec!["worker", "--verbose", "-n", "3"]);
            }
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn watch_requires_a_command() {
        let err = Cli::try_parse_from(["pipewatch", "watch"]).expect_err("command is required");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn parses_repeated_send_values() {
        let cli = Cli::try_parse_from([
            "pipewatch",
            "send",
            "--json",
            "42",
            "--json",
            "{\"k\":1}",
            "--text",
            "hi",
            "--line",
            "starting",
            "--exit-code",
            "2",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.json.len(), 2);
                assert_eq!(args.text, vec!["hi"]);
                assert_eq!(args.line, vec!["starting"]);
                assert_eq!(args.exit_code, 2);
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["pipewatch", "version", "--format", "pretty"])
            .expect("global args should parse after subcommand");
        assert_eq!(cli.format, Some(OutputFormat::Pretty));
    }
}
