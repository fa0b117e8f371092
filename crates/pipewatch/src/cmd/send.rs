use std::io::Write;

use pipewatch_frame::Message;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let events = resolve_events(&args)?;

    for event in &events {
        pipewatch_frame::send(event).map_err(|err| frame_error("send failed", err))?;
    }
    tracing::debug!(count = events.len(), "events sent");

    let mut stderr = std::io::stderr().lock();
    for line in &args.line {
        writeln!(stderr, "{line}").map_err(|err| io_error("write failed", err))?;
    }
    stderr.flush().map_err(|err| io_error("write failed", err))?;

    Ok(args.exit_code)
}

/// Build every event up front so invalid input sends nothing.
fn resolve_events(args: &SendArgs) -> CliResult<Vec<Message>> {
    let mut events = Vec::with_capacity(args.json.len() + args.text.len());
    for json in &args.json {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        events.push(Message::from(value));
    }
    events.extend(args.text.iter().map(|text| Message::Text(text.clone())));
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_args(json: &[&str], text: &[&str]) -> SendArgs {
        SendArgs {
            json: json.iter().map(|s| s.to_string()).collect(),
            text: text.iter().map(|s| s.to_string()).collect(),
            line: Vec::new(),
            exit_code: 0,
        }
    }

    #[test]
    fn json_values_then_texts() {
        let events =
            resolve_events(&send_args(&["42", r#"{"op":"write"}"#], &["hello"])).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Message::Int(42));
        assert_eq!(
            events[1].get("op").and_then(Message::as_text),
            Some("write")
        );
        assert_eq!(events[2], Message::Text("hello".to_string()));
    }

    #[test]
    fn invalid_json_is_usage_error() {
        let err = resolve_events(&send_args(&["42", "{nope"], &[])).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("--json"));
    }
}
