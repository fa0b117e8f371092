//! Blocking decode loops, one OS thread per stream.
//!
//! A decoder thread owns its pipe exclusively and suspends only inside the
//! blocking read. It cannot be interrupted: if the child keeps a pipe open
//! without writing or exiting, that decoder waits indefinitely. It ends on
//! end-of-file, on the first error, or when its receiver has been dropped.

use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use pipewatch_frame::{FrameConfig, FrameReader};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::stream::{Item, StreamError, StreamId};

/// Produces successive units from one pipe.
pub trait StreamDecoder: Send + 'static {
    type Output: Send + 'static;

    /// Block until the next unit is available.
    ///
    /// `Ok(None)` means clean end-of-stream. Any error is final.
    fn next_value(&mut self) -> Result<Option<Self::Output>, StreamError>;
}

/// Decodes framed messages from the primary stream.
pub struct FrameDecoder<R, M> {
    reader: FrameReader<R>,
    _message: PhantomData<fn() -> M>,
}

impl<R: Read, M> FrameDecoder<R, M> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            reader: FrameReader::with_config(inner, config),
            _message: PhantomData,
        }
    }
}

impl<R, M> StreamDecoder for FrameDecoder<R, M>
where
    R: Read + Send + 'static,
    M: DeserializeOwned + Send + 'static,
{
    type Output = M;

    fn next_value(&mut self) -> Result<Option<M>, StreamError> {
        Ok(self.reader.read_message()?)
    }
}

/// Decodes newline-delimited text from the secondary stream.
///
/// Lines are delivered without their trailing `\n` (or `\r\n`). Invalid
/// UTF-8 is replaced with U+FFFD. A final line without a newline is still
/// delivered.
pub struct LineDecoder<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: Read> LineDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }
}

impl<R: Read + Send + 'static> StreamDecoder for LineDecoder<R> {
    type Output = String;

    fn next_value(&mut self) -> Result<Option<String>, StreamError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Start a decoder thread for `stream` and return its queue and handle.
pub(crate) fn spawn_decoder<D: StreamDecoder>(
    stream: StreamId,
    mut decoder: D,
) -> std::io::Result<(mpsc::Receiver<Item<D::Output>>, JoinHandle<()>)> {
    let (queue, items) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(format!("pipewatch-{stream}"))
        .spawn(move || run_decoder(stream, &mut decoder, &queue))?;
    Ok((items, handle))
}

fn run_decoder<D: StreamDecoder>(
    stream: StreamId,
    decoder: &mut D,
    queue: &mpsc::Sender<Item<D::Output>>,
) {
    debug!(%stream, "decoder started");
    loop {
        let item = match decoder.next_value() {
            Ok(Some(value)) => Item::Value(value),
            Ok(None) => {
                debug!(%stream, "end of stream");
                let _ = queue.send(Item::EndOfStream(stream));
                return;
            }
            Err(error) => {
                warn!(%stream, %error, "decoder stopped on stream violation");
                let _ = queue.send(Item::Violation { stream, error });
                return;
            }
        };

        if queue.send(item).is_err() {
            debug!(%stream, "receiver dropped, decoder exiting");
            return;
        }
    }
}
