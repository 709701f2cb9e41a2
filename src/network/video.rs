//! Video channel - length-prefixed frame reception
//!
//! One call to `read_frame` consumes exactly one frame unit from the
//! stream. Length fields outside the valid range are discarded and
//! scanning resumes at the next 4-byte field, so a garbage length
//! desynchronizes at worst until the next plausible value instead of
//! killing the channel.

use bytes::Bytes;
use tokio::io::AsyncRead;

use super::io::{read_full, ReadError};
use crate::protocol::{decode_len, len_in_range, LEN_PREFIX_LEN};

/// Read the next video frame off the stream.
///
/// Blocks until a full `[length][payload]` unit is available. Returns
/// `ReadError::Closed` when the peer closes on a frame boundary; a
/// closure mid-unit surfaces as `ShortRead`. Either way the caller is
/// expected to stop the loop.
pub async fn read_frame<R>(stream: &mut R) -> Result<Bytes, ReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut prefix = [0u8; LEN_PREFIX_LEN];
        read_full(stream, &mut prefix).await?;

        let declared = decode_len(prefix);
        if !len_in_range(declared) {
            tracing::trace!(declared, "skipping out-of-range frame length");
            continue;
        }

        let mut payload = vec![0u8; declared as usize];
        match read_full(stream, &mut payload).await {
            Ok(()) => return Ok(Bytes::from(payload)),
            // EOF after the length prefix means a truncated frame, not
            // a clean boundary close
            Err(ReadError::Closed) => {
                return Err(ReadError::ShortRead { wanted: declared as usize, got: 0 })
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;

    #[tokio::test]
    async fn test_reads_one_frame() {
        let unit = encode_frame(b"frame payload");
        let mut stream = tokio_test::io::Builder::new().read(&unit).build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(&frame[..], b"frame payload");
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let unit = encode_frame(b"split across tcp segments");
        let (a, rest) = unit.split_at(2);
        let (b, c) = rest.split_at(9);
        let mut stream = tokio_test::io::Builder::new()
            .read(a)
            .read(b)
            .read(c)
            .build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(&frame[..], b"split across tcp segments");
    }

    #[tokio::test]
    async fn test_zero_length_unit_is_skipped() {
        let mut wire = 0i32.to_le_bytes().to_vec();
        wire.extend_from_slice(&encode_frame(b"real"));
        let mut stream = tokio_test::io::Builder::new().read(&wire).build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(&frame[..], b"real");
    }

    #[tokio::test]
    async fn test_oversized_length_is_skipped() {
        let mut wire = 10_000_001i32.to_le_bytes().to_vec();
        wire.extend_from_slice(&encode_frame(b"after garbage"));
        let mut stream = tokio_test::io::Builder::new().read(&wire).build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(&frame[..], b"after garbage");
    }

    #[tokio::test]
    async fn test_negative_length_is_skipped() {
        let mut wire = (-7i32).to_le_bytes().to_vec();
        wire.extend_from_slice(&encode_frame(b"ok"));
        let mut stream = tokio_test::io::Builder::new().read(&wire).build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(&frame[..], b"ok");
    }

    #[tokio::test]
    async fn test_max_length_frame_is_delivered() {
        let payload = vec![0x5Au8; crate::protocol::MAX_FRAME_LEN];
        let unit = encode_frame(&payload);
        let mut stream = tokio_test::io::Builder::new().read(&unit).build();
        let frame = read_frame(&mut stream).await.unwrap();
        assert_eq!(frame.len(), crate::protocol::MAX_FRAME_LEN);
    }

    #[tokio::test]
    async fn test_close_on_boundary_is_clean() {
        let unit = encode_frame(b"last frame");
        let mut stream = tokio_test::io::Builder::new().read(&unit).build();
        read_frame(&mut stream).await.unwrap();
        match read_frame(&mut stream).await {
            Err(ReadError::Closed) => {}
            other => panic!("expected clean close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_payload_is_short_read() {
        let unit = encode_frame(b"never fully arrives");
        let mut stream = tokio_test::io::Builder::new().read(&unit[..8]).build();
        match read_frame(&mut stream).await {
            Err(ReadError::ShortRead { .. }) => {}
            other => panic!("expected short read, got {:?}", other),
        }
    }
}
