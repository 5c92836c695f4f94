use std::io::{self, Cursor};

use tokio::io::{AsyncWriteExt, DuplexStream};

/// Finite stream body holding `lines`, each terminated by a newline.
#[must_use]
pub fn line_source(lines: &[&str]) -> Cursor<Vec<u8>> {
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
    }
    Cursor::new(buf)
}

/// Write half of an in-memory stream body that stays open until dropped or closed.
#[derive(Debug)]
pub struct StreamFeed {
    writer: DuplexStream,
}

/// Open-ended stream body fed through the returned [`StreamFeed`].
#[must_use]
pub fn stream_feed(capacity: usize) -> (StreamFeed, DuplexStream) {
    let (writer, reader) = tokio::io::duplex(capacity);
    (StreamFeed { writer }, reader)
}

impl StreamFeed {
    /// Write one record followed by a newline.
    ///
    /// # Errors
    /// Fails once the reading side has been dropped.
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Write raw bytes without a terminator, e.g. a partial record.
    ///
    /// # Errors
    /// Fails once the reading side has been dropped.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// End the stream; the reader sees end of file.
    ///
    /// # Errors
    /// Propagates the shutdown error of the write half.
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
