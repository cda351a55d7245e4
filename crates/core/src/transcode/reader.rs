//! Chunked reading of a child's diagnostic stream with an idle timeout.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::timeout;
use tracing::warn;

use super::error::StreamReadError;

/// Something that can be forcibly stopped when its output goes quiet.
pub trait Terminate {
    /// Requests a hard kill. Must not block.
    fn terminate(&mut self) -> io::Result<()>;
}

impl Terminate for tokio::process::Child {
    fn terminate(&mut self) -> io::Result<()> {
        self.start_kill()
    }
}

/// Decodes a chunk, falling back to ISO-8859-1 for invalid UTF-8.
pub fn decode_chunk(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Delivers `\n`- or `\r`-terminated chunks of a stream to a consumer.
///
/// Each read races against the idle timeout; the timer restarts with every
/// chunk. When it fires, the attached process is terminated and the reader
/// gives up with everything captured so far.
pub struct StreamLineTimeoutReader<R> {
    reader: BufReader<R>,
    idle_timeout: Option<Duration>,
    pending: Vec<u8>,
    output: String,
}

impl<R: AsyncRead + Unpin> StreamLineTimeoutReader<R> {
    /// Wraps a stream. `None` reads without a timer.
    pub fn new(stream: R, idle_timeout: Option<Duration>) -> Self {
        Self {
            reader: BufReader::new(stream),
            idle_timeout,
            pending: Vec::new(),
            output: String::new(),
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Everything read so far, one chunk per line.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    /// Reads until end of stream, calling `on_chunk` for every non-empty chunk.
    pub async fn for_each_chunk<T, F>(
        &mut self,
        process: &mut T,
        mut on_chunk: F,
    ) -> Result<(), StreamReadError>
    where
        T: Terminate,
        F: FnMut(&str),
    {
        loop {
            let next = match self.idle_timeout {
                Some(limit) => match timeout(limit, self.next_chunk()).await {
                    Ok(next) => next?,
                    Err(_) => {
                        if let Err(e) = process.terminate() {
                            warn!(error = %e, "Failed to kill hung process");
                        }
                        self.flush_pending();
                        return Err(StreamReadError::IdleTimeout {
                            idle_timeout: limit,
                            output: self.output.clone(),
                        });
                    }
                },
                None => self.next_chunk().await?,
            };

            let Some(chunk) = next else {
                return Ok(());
            };
            if chunk.is_empty() {
                continue;
            }

            let chunk = decode_chunk(chunk);
            self.output.push_str(&chunk);
            self.output.push('\n');
            on_chunk(&chunk);
        }
    }

    /// Reads one delimited chunk. Partial data survives cancellation in `pending`.
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(i) => {
                    self.pending.extend_from_slice(&available[..i]);
                    self.reader.consume(i + 1);
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
                None => {
                    let n = available.len();
                    self.pending.extend_from_slice(available);
                    self.reader.consume(n);
                }
            }
        }
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let partial = decode_chunk(std::mem::take(&mut self.pending));
            self.output.push_str(&partial);
            self.output.push('\n');
        }
    }
}
