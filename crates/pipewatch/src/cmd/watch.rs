use std::cell::RefCell;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipewatch_frame::{FrameConfig, Message};
use pipewatch_receiver::{monitor_with_config, Item, ManagerConfig, StreamError, StreamId};

use crate::cmd::WatchArgs;
use crate::exit::{child_exit_code, receiver_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{format_event, format_exit, format_violation, OutputFormat, RecordWriter};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let config = manager_config(&args)?;
    let program = args.command.first().cloned().unwrap_or_default();

    // The child shares our process group and receives Ctrl-C itself; keep
    // running so its remaining output and exit status are still reported.
    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(interrupted.clone())?;

    let records = RefCell::new(RecordWriter::stdout());
    let mut seq = 0u64;
    let mut violations = 0usize;
    let status = monitor_with_config(
        &args.command,
        config,
        |item: Item<Message>| match item {
            Item::Value(event) => {
                seq += 1;
                records.borrow_mut().emit(&format_event(seq, &event, format));
            }
            Item::Violation { stream, error } => {
                violations += 1;
                report_violation(&records, stream, &error, format);
            }
            Item::EndOfStream(_) => tracing::debug!("event stream closed"),
        },
        |item| match item {
            Item::Value(line) => forward_line(&program, &line),
            Item::Violation { stream, error } => {
                report_violation(&records, stream, &error, format)
            }
            Item::EndOfStream(_) => tracing::debug!("line stream closed"),
        },
        |status| {
            records
                .borrow_mut()
                .emit(&format_exit(&program, status, format));
        },
    )
    .map_err(|err| receiver_error("watch failed", err))?;

    if records.borrow().is_closed() {
        tracing::debug!("stdout closed early; later records were dropped");
    }

    if interrupted.load(Ordering::SeqCst) {
        tracing::info!("interrupted; child has exited");
    }
    if violations > 0 {
        tracing::warn!(violations, "event stream ended with a protocol violation");
    }
    Ok(child_exit_code(status))
}

fn manager_config(args: &WatchArgs) -> CliResult<ManagerConfig> {
    let mut frame = FrameConfig::default();
    if let Some(max) = args.max_payload {
        if max == 0 {
            return Err(CliError::new(USAGE, "--max-payload must be greater than zero"));
        }
        frame.max_payload_size = max;
    }

    Ok(ManagerConfig {
        poll_interval: parse_duration(&args.poll_interval)?,
        final_drain_timeout: args
            .final_drain_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?,
        frame,
    })
}

fn report_violation<W: Write>(
    records: &RefCell<RecordWriter<W>>,
    stream: StreamId,
    error: &StreamError,
    format: OutputFormat,
) {
    records
        .borrow_mut()
        .emit(&format_violation(stream, error, format));
}

/// Echo one child stderr line on our stderr; a closed stderr is ignored.
fn forward_line(program: &str, line: &str) {
    let _ = writeln!(io::stderr().lock(), "{program}: {line}");
}

fn install_ctrlc_handler(interrupted: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
