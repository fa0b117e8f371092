use std::io::{self, IsTerminal, Write};
use std::process::ExitStatus;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pipewatch_frame::Message;
use pipewatch_receiver::{StreamError, StreamId};
use serde::Serialize;

use crate::exit::child_exit_code;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Line-oriented record output that stops quietly once the reader is gone.
///
/// The first failed write (typically `BrokenPipe` under `| head -1`) marks
/// the sink closed and later records are dropped, so supervision and the
/// final drain carry on.
pub struct RecordWriter<W> {
    out: W,
    closed: bool,
}

impl RecordWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, closed: false }
    }

    /// Write one record line and flush. Returns `false` once closed.
    pub fn emit(&mut self, record: &str) -> bool {
        if self.closed {
            return false;
        }
        let written = writeln!(self.out, "{record}").and_then(|()| self.out.flush());
        if let Err(err) = written {
            if err.kind() == io::ErrorKind::BrokenPipe {
                tracing::debug!("stdout closed; dropping further records");
            } else {
                tracing::warn!(error = %err, "failed writing record; dropping further records");
            }
            self.closed = true;
        }
        !self.closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Event {
        seq: u64,
        kind: &'static str,
        event: &'a Message,
        timestamp: String,
    },
    Violation {
        stream: &'static str,
        protocol: bool,
        error: String,
        timestamp: String,
    },
    Exit {
        program: &'a str,
        code: i32,
        success: bool,
        timestamp: String,
    },
}

impl Record<'_> {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub fn format_event(seq: u64, event: &Message, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => Record::Event {
            seq,
            kind: event.kind(),
            event,
            timestamp: now_unix_seconds(),
        }
        .to_json(),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "KIND", "VALUE"])
                .add_row(vec![seq.to_string(), event.kind().to_string(), render(event)]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("event #{seq} {}: {}", event.kind(), render(event)),
    }
}

pub fn format_violation(stream: StreamId, error: &StreamError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => Record::Violation {
            stream: stream.as_str(),
            protocol: error.is_protocol_violation(),
            error: error.to_string(),
            timestamp: now_unix_seconds(),
        }
        .to_json(),
        OutputFormat::Table | OutputFormat::Pretty => {
            format!("{stream} stream stopped: {error}")
        }
    }
}

pub fn format_exit(program: &str, status: ExitStatus, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => Record::Exit {
            program,
            code: child_exit_code(status),
            success: status.success(),
            timestamp: now_unix_seconds(),
        }
        .to_json(),
        OutputFormat::Table | OutputFormat::Pretty => format!("{program} exited: {status}"),
    }
}

/// Compact single-line rendering of a message for human formats.
pub fn render(message: &Message) -> String {
    match message {
        Message::Null => "null".to_string(),
        Message::Bool(value) => value.to_string(),
        Message::Int(value) => value.to_string(),
        Message::Float(value) => value.to_string(),
        Message::Text(text) => format!("{text:?}"),
        Message::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        Message::List(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        Message::Map(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{key}: {}", render(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn record_writer_stops_after_broken_pipe() {
        let mut writer = RecordWriter::new(ClosedPipe { attempts: 0 });

        assert!(!writer.emit("first"));
        assert!(!writer.emit("second"));
        assert!(writer.is_closed());
        assert_eq!(writer.out.attempts, 1);
    }

    #[test]
    fn record_writer_appends_newlines() {
        let mut writer = RecordWriter::new(Vec::new());
        assert!(writer.emit("a"));
        assert!(writer.emit("b"));
        assert!(!writer.is_closed());
        assert_eq!(writer.out, b"a\nb\n");
    }

    #[test]
    fn render_nested_message() {
        let message = Message::map([
            ("name", Message::from("job")),
            ("done", Message::List(vec![Message::Int(1), Message::Bool(true)])),
            ("blob", Message::Bytes(vec![0, 1, 2])),
        ]);
        assert_eq!(
            render(&message),
            "{blob: <3 bytes>, done: [1, true], name: \"job\"}"
        );
    }

    #[test]
    fn json_event_record_carries_tagged_message() {
        let line = format_event(3, &Message::Int(42), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["record"], "event");
        assert_eq!(value["seq"], 3);
        assert_eq!(value["kind"], "int");
        assert_eq!(value["event"]["type"], "int");
        assert_eq!(value["event"]["value"], 42);
    }

    #[test]
    fn pretty_violation_names_stream() {
        let error = StreamError::Io(std::io::Error::other("boom"));
        let line = format_violation(StreamId::Primary, &error, OutputFormat::Pretty);
        assert_eq!(line, "primary stream stopped: stream I/O error: boom");
    }

    #[cfg(unix)]
    #[test]
    fn json_exit_record_reports_code() {
        use std::os::unix::process::ExitStatusExt;

        let line = format_exit("worker", ExitStatus::from_raw(2 << 8), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["record"], "exit");
        assert_eq!(value["program"], "worker");
        assert_eq!(value["code"], 2);
        assert_eq!(value["success"], false);
    }
}
