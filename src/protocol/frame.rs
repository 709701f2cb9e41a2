//! Video frame framing
//!
//! Frames arrive as `[4-byte length][payload]` units with no header or
//! footer beyond the prefix. The length is a signed little-endian i32,
//! matching what the robot's camera service emits. Pure transformation
//! only; the read side lives in `network::video`.

/// Maximum accepted frame payload size in bytes
pub const MAX_FRAME_LEN: usize = 10_000_000;

/// Size of the length prefix on the wire
pub const LEN_PREFIX_LEN: usize = 4;

/// Decode a length prefix
pub fn decode_len(prefix: [u8; LEN_PREFIX_LEN]) -> i32 {
    i32::from_le_bytes(prefix)
}

/// Whether a declared length is acceptable as a frame payload size.
///
/// Out-of-range values are skipped by the reader rather than treated as
/// fatal, so a single garbage length cannot end the session.
pub fn len_in_range(len: i32) -> bool {
    len > 0 && len as usize <= MAX_FRAME_LEN
}

/// Encode a payload into a complete frame unit (prefix + payload).
///
/// Panics if the payload exceeds `MAX_FRAME_LEN`; callers frame data
/// they produced themselves.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= MAX_FRAME_LEN, "frame too large: {} bytes", payload.len());
    let mut unit = Vec::with_capacity(LEN_PREFIX_LEN + payload.len());
    unit.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    unit.extend_from_slice(payload);
    unit
}
