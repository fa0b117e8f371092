use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::decoder::{spawn_decoder, StreamDecoder};
use crate::error::{ReceiverError, Result};
use crate::stream::{Item, StreamId};

/// Owns one decoder thread and the queue it feeds.
///
/// The callback is not stored here: the owner passes it to every drain
/// call, so it always runs on the draining thread.
pub struct Receiver<V> {
    stream: StreamId,
    queue: mpsc::Receiver<Item<V>>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl<V: Send + 'static> Receiver<V> {
    /// Start `decoder` on its own thread.
    pub fn spawn<D>(stream: StreamId, decoder: D) -> Result<Self>
    where
        D: StreamDecoder<Output = V>,
    {
        let (queue, worker) = spawn_decoder(stream, decoder)
            .map_err(|source| ReceiverError::DecoderThread { stream, source })?;
        Ok(Self {
            stream,
            queue,
            worker: Some(worker),
            finished: false,
        })
    }
}

impl<V> Receiver<V> {
    /// Deliver every item that is already queued, in order, then return.
    ///
    /// Never waits for new items; on an empty queue this is a no-op. Safe to
    /// call any number of times, including after the decoder has stopped.
    /// Returns the number of items delivered.
    pub fn drain<F>(&mut self, handler: &mut F) -> usize
    where
        F: FnMut(Item<V>) + ?Sized,
    {
        let mut delivered = 0usize;
        loop {
            match self.queue.try_recv() {
                Ok(item) => {
                    self.deliver(item, handler);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Deliver items until the stream's terminal item has been delivered.
    ///
    /// Blocks while the decoder is still reading. With `timeout` set, gives
    /// up once it elapses and returns `false`; items arriving later stay
    /// queued for the next drain.
    pub fn drain_until_end<F>(&mut self, handler: &mut F, timeout: Option<Duration>) -> bool
    where
        F: FnMut(Item<V>) + ?Sized,
    {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        while !self.finished {
            let next = match deadline {
                None => self
                    .queue
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
                Some(deadline) => self
                    .queue
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
            };
            match next {
                Ok(item) => self.deliver(item, handler),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(stream = %self.stream, "decoder ended without a terminal item");
                    return false;
                }
            }
        }
        true
    }

    /// Join the decoder thread if it has stopped.
    ///
    /// A decoder still blocked in a read cannot be interrupted; it is
    /// detached instead and `false` is returned. A detached decoder only
    /// ever touches its own queue.
    pub fn join(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return true;
        };
        if !self.finished && !worker.is_finished() {
            debug!(stream = %self.stream, "detaching decoder still blocked in read");
            return false;
        }
        if worker.join().is_err() {
            warn!(stream = %self.stream, "decoder thread panicked");
        }
        true
    }

    /// Discard whatever is left, waiting up to `grace` for the terminal
    /// item, then join the decoder.
    pub fn shutdown(&mut self, grace: Duration) -> bool {
        self.drain_until_end(&mut |_item: Item<V>| {}, Some(grace));
        self.join()
    }

    /// True once the terminal item has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    fn deliver<F>(&mut self, item: Item<V>, handler: &mut F)
    where
        F: FnMut(Item<V>) + ?Sized,
    {
        if self.finished {
            // The decoder never sends after its terminal item.
            debug!(stream = %self.stream, "ignoring item after end of stream");
            return;
        }
        if item.is_terminal() {
            self.finished = true;
        }
        trace!(stream = %self.stream, terminal = self.finished, "delivering item");
        handler(item);
    }
}

impl<V> Drop for Receiver<V> {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::time::{Duration, Instant};

    use pipewatch_frame::{FrameWriter, Message};

    use super::*;
    use crate::decoder::{FrameDecoder, LineDecoder};

    fn wait_until_finished<V>(receiver: &mut Receiver<V>, seen: &mut Vec<Item<V>>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !receiver.is_finished() {
            receiver.drain(&mut |item| seen.push(item));
            assert!(Instant::now() < deadline, "receiver did not finish in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn drain_delivers_in_order_and_sentinel_last() {
        let mut writer = FrameWriter::new(Vec::new());
        for i in 0..50 {
            writer.send(&Message::Int(i)).unwrap();
        }
        let mut receiver = Receiver::spawn(
            StreamId::Primary,
            FrameDecoder::<_, Message>::new(Cursor::new(writer.into_inner())),
        )
        .unwrap();

        let mut seen = Vec::new();
        wait_until_finished(&mut receiver, &mut seen);

        assert_eq!(seen.len(), 51);
        for (i, item) in seen.iter().take(50).enumerate() {
            assert_eq!(item.value(), Some(&Message::Int(i as i64)));
        }
        assert!(seen[50].is_end_of(StreamId::Primary));
        assert_eq!(seen.iter().filter(|item| item.is_terminal()).count(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn drain_does_not_block_on_open_empty_pipe() {
        let (mut tx, rx) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut receiver = Receiver::spawn(StreamId::Secondary, LineDecoder::new(rx)).unwrap();

        let started = Instant::now();
        let mut calls = 0usize;
        assert_eq!(receiver.drain(&mut |_item| calls += 1), 0);
        assert_eq!(receiver.drain(&mut |_item| calls += 1), 0);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(calls, 0);

        tx.write_all(b"hello\n").unwrap();
        drop(tx);

        let mut seen = Vec::new();
        wait_until_finished(&mut receiver, &mut seen);
        assert_eq!(seen[0].value().map(String::as_str), Some("hello"));
        assert!(seen[1].is_end_of(StreamId::Secondary));
    }

    #[test]
    fn drain_after_finish_is_a_noop() {
        let mut receiver = Receiver::spawn(
            StreamId::Secondary,
            LineDecoder::new(Cursor::new(b"one\n".to_vec())),
        )
        .unwrap();

        let mut seen = Vec::new();
        let done =
            receiver.drain_until_end(&mut |item| seen.push(item), Some(Duration::from_secs(5)));
        assert!(done);
        assert_eq!(seen.len(), 2);

        assert_eq!(receiver.drain(&mut |item| seen.push(item)), 0);
        assert_eq!(seen.len(), 2);
        assert!(receiver.join());
    }

    #[test]
    #[cfg(unix)]
    fn drain_until_end_times_out_on_open_pipe() {
        let (tx, rx) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut receiver = Receiver::spawn(StreamId::Secondary, LineDecoder::new(rx)).unwrap();

        let mut seen = Vec::new();
        let done =
            receiver.drain_until_end(&mut |item| seen.push(item), Some(Duration::from_millis(50)));
        assert!(!done);
        assert!(seen.is_empty());
        assert!(!receiver.join());

        drop(tx);
    }

    #[test]
    fn shutdown_discards_residue_and_joins() {
        let mut receiver = Receiver::spawn(
            StreamId::Secondary,
            LineDecoder::new(Cursor::new(b"a\nb\nc\n".to_vec())),
        )
        .unwrap();

        assert!(receiver.shutdown(Duration::from_secs(5)));
        assert!(receiver.is_finished());
        assert_eq!(receiver.stream(), StreamId::Secondary);
    }

    #[test]
    fn boxed_handler_can_be_drained_into() {
        let mut seen = Vec::new();
        {
            let mut handler: Box<dyn FnMut(Item<String>) + '_> =
                Box::new(|item| seen.push(item));
            let mut receiver = Receiver::spawn(
                StreamId::Secondary,
                LineDecoder::new(Cursor::new(b"x\n".to_vec())),
            )
            .unwrap();
            receiver.drain_until_end(&mut *handler, None);
        }
        assert_eq!(seen.len(), 2);
    }
}
