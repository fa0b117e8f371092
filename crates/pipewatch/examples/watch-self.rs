//! Parent and child in one binary: the example re-runs itself as the child.
//!
//! Run with:
//!   cargo run --example watch-self
//!
//! The child emits a few progress events on stdout and a status line on
//! stderr; the parent prints everything it receives, then the exit status.

use std::thread;
use std::time::Duration;

use pipewatch::frame::Message;
use pipewatch::Item;

fn child() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("child starting");
    for step in 1..=3i64 {
        pipewatch::send(&Message::map([
            ("step", Message::Int(step)),
            ("of", Message::Int(3)),
        ]))?;
        thread::sleep(Duration::from_millis(50));
    }
    eprintln!("child done");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().nth(1).as_deref() == Some("child") {
        return child();
    }

    let exe = std::env::current_exe()?;
    let argv = [exe.into_os_string(), "child".into()];

    let status = pipewatch::monitor(
        argv,
        |item| match item {
            Item::Value(event) => println!("event: {event:?}"),
            Item::Violation { stream, error } => println!("{stream} violation: {error}"),
            Item::EndOfStream(stream) => println!("{stream} closed"),
        },
        |item| {
            if let Item::Value(line) = item {
                println!("line: {line}");
            }
        },
        |status| println!("child exited: {status}"),
    )?;

    std::process::exit(status.code().unwrap_or(1));
}
