//! Exact-read primitive for the video stream
//!
//! TCP reads return whatever is buffered, so a frame payload usually
//! arrives in several pieces. `read_full` loops until the buffer is
//! filled and reports closure before completion distinctly from success.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read errors
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed before this read delivered anything
    #[error("stream closed by peer")]
    Closed,

    /// Peer closed after delivering part of the requested bytes
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },
}

impl ReadError {
    /// A close on a read boundary is normal loop termination, not a fault
    pub fn is_clean_close(&self) -> bool {
        matches!(self, ReadError::Closed)
    }
}

/// Fill `buf` completely from `stream`, tolerating partial reads.
///
/// Returns `ReadError::Closed` on a zero-length first read,
/// `ReadError::ShortRead` when the stream ends mid-fill, and never
/// reports a partially filled buffer as success. Stream errors
/// propagate immediately without retry.
pub async fn read_full<R>(stream: &mut R, buf: &mut [u8]) -> Result<(), ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 {
                ReadError::Closed
            } else {
                ReadError::ShortRead { wanted: buf.len(), got: filled }
            });
        }
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_chunk() {
        let mut stream = tokio_test::io::Builder::new().read(b"abcdef").build();
        let mut buf = [0u8; 6];
        read_full(&mut stream, &mut buf).await.unwrap();
        assert_eq!(&buf, b"abcdef");
    }

    #[tokio::test]
    async fn test_arbitrary_chunking_matches_single_chunk() {
        let mut stream = tokio_test::io::Builder::new()
            .read(b"a")
            .read(b"bc")
            .read(b"de")
            .read(b"f")
            .build();
        let mut buf = [0u8; 6];
        read_full(&mut stream, &mut buf).await.unwrap();
        assert_eq!(&buf, b"abcdef");
    }

    #[tokio::test]
    async fn test_extra_bytes_stay_buffered() {
        let mut stream = tokio_test::io::Builder::new()
            .read(b"abcd")
            .read(b"ef")
            .build();
        let mut buf = [0u8; 4];
        read_full(&mut stream, &mut buf).await.unwrap();
        assert_eq!(&buf, b"abcd");
        let mut rest = [0u8; 2];
        read_full(&mut stream, &mut rest).await.unwrap();
        assert_eq!(&rest, b"ef");
    }

    #[tokio::test]
    async fn test_short_read_is_not_success() {
        let mut stream = tokio_test::io::Builder::new().read(b"abc").build();
        let mut buf = [0u8; 8];
        match read_full(&mut stream, &mut buf).await {
            Err(ReadError::ShortRead { wanted: 8, got: 3 }) => {}
            other => panic!("expected short read, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_immediate_eof_is_closed() {
        let mut stream = tokio_test::io::Builder::new().build();
        let mut buf = [0u8; 4];
        match read_full(&mut stream, &mut buf).await {
            Err(ReadError::Closed) => {}
            other => panic!("expected closed, got {:?}", other),
        }
    }
}
