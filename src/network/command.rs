//! Command channel - outbound line writer
//!
//! Wraps the write half of the command stream. Each send is one
//! newline-terminated UTF-8 line, written fully before returning;
//! partial writes are retried inside `write_all`, never exposed.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writer for the command stream
pub struct CommandWriter<W> {
    stream: W,
}

impl<W> CommandWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    /// Send one command line, appending the terminating newline
    pub async fn send(&mut self, line: &str) -> std::io::Result<()> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}

/// Buffer size for raw chunk reads on the command receive path.
///
/// Server responses are short status lines; chunks are forwarded as-is
/// without line framing.
pub const RECV_CHUNK_LEN: usize = 1024;
