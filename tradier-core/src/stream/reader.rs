use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tradier_types::TradierError;

use super::envelope::StreamEnvelope;

/// Longest record accepted from a stream, excluding the line terminator.
pub const MAX_RECORD_BYTES: usize = 64 * 1024;

/// Background reader that splits a newline-delimited JSON stream into envelopes.
///
/// The reader task owns the byte source and the only sender of `output`. When
/// the task ends (end of stream, [`stop`](Self::stop), a read error, or the
/// receiver going away) the source is dropped and the channel closes; channel
/// closure is the only end-of-stream signal consumers get.
///
/// Cancellation is cooperative: the token is checked before every read and
/// raced against every read and every delivery, so a record that was read but
/// not yet delivered when the stop arrives is dropped. Dropping the handle
/// stops the reader as well.
///
/// A record longer than [`MAX_RECORD_BYTES`] is discarded up to its line
/// terminator and replaced by an envelope carrying a `TradierError::Stream`.
pub struct EventStreamReader {
    shutdown: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl EventStreamReader {
    /// Spawn the reader task on the current Tokio runtime.
    pub fn spawn<R>(source: R, output: mpsc::Sender<StreamEnvelope>) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::spawn_with_token(source, output, CancellationToken::new())
    }

    /// Spawn the reader task stopping on an externally owned token.
    pub fn spawn_with_token<R>(
        source: R,
        output: mpsc::Sender<StreamEnvelope>,
        shutdown: CancellationToken,
    ) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let join = tokio::spawn(consume_events(source, output, shutdown.clone()));
        Self {
            shutdown,
            join: Some(join),
        }
    }

    /// Ask the reader task to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Returns true once the reader task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the reader task to exit.
    pub async fn wait(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    /// Stop the reader and wait for its task to exit.
    pub async fn shutdown(self) {
        self.stop();
        self.wait().await;
    }
}

impl Drop for EventStreamReader {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(join) = self.join.take()
            && !join.is_finished()
        {
            join.abort();
        }
    }
}

async fn consume_events<R>(
    source: R,
    output: mpsc::Sender<StreamEnvelope>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Send + 'static,
{
    let mut reader = Box::pin(BufReader::new(source));
    let mut line = Vec::with_capacity(1024);

    #[cfg(feature = "tracing")]
    tracing::debug!("market event reader started");

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            read = read_record(&mut reader, &mut line, MAX_RECORD_BYTES) => read,
        };
        let envelope = match read {
            Ok(Record::Eof) => break,
            Ok(Record::Line) => {
                let record = trim_line_end(&line);
                if record.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                StreamEnvelope::decode(record)
            }
            Ok(Record::TooLong(len)) => StreamEnvelope::rejected(TradierError::Stream(format!(
                "record of {len} bytes exceeds the {MAX_RECORD_BYTES}-byte limit"
            ))),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "market event stream read failed");
                break;
            }
        };

        #[cfg(feature = "tracing")]
        if let Some(err) = &envelope.error {
            tracing::warn!(error = %err, "undecodable market event");
        }

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            sent = output.send(envelope) => {
                if sent.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("market event receiver dropped");
                    break;
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(cancelled = shutdown.is_cancelled(), "market event reader exiting");
    // Closing order: the source first, then the channel as `output` drops.
    drop(reader);
}

enum Record {
    Eof,
    Line,
    /// Total bytes discarded, terminator included.
    TooLong(usize),
}

/// Read one newline-terminated record into `line`, holding at most `max` bytes.
///
/// Once a record outgrows `max` the buffered part is dropped and the rest is
/// consumed without being stored. A final record without a terminator counts.
async fn read_record<B>(reader: &mut B, line: &mut Vec<u8>, max: usize) -> io::Result<Record>
where
    B: AsyncBufRead + Unpin,
{
    let mut discarded = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if discarded > 0 {
                Record::TooLong(discarded)
            } else if line.is_empty() {
                Record::Eof
            } else {
                Record::Line
            });
        }
        let (used, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        if discarded == 0 {
            line.extend_from_slice(&available[..used]);
            if line.len() - usize::from(done) > max {
                discarded = line.len();
                line.clear();
            }
        } else {
            discarded += used;
        }
        reader.consume(used);
        if done {
            return Ok(if discarded > 0 {
                Record::TooLong(discarded)
            } else {
                Record::Line
            });
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}
