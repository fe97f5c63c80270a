//! Length-prefixed JSON record framing for the log-structured backend.
//!
//! A frame is a `u32` little-endian payload length followed by the payload:
//! one [`StarSystem`] serialized as camelCase JSON. The length prefix lets a
//! recovery scan walk the log without parsing payloads it will throw away.

use surveyor_core::StarSystem;

use crate::errors::{Result, StoreError};

/// Size of the length prefix in bytes.
pub const LEN_PREFIX: usize = 4;

/// Upper bound on a single record payload. A length prefix above this is
/// treated as log corruption rather than honored with a giant allocation.
pub const MAX_RECORD_LEN: u32 = 16 * 1024 * 1024;

/// Serialize a system into a complete frame (prefix + payload).
pub fn encode_record(system: &StarSystem) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(system)?;
    if payload.len() as u64 > u64::from(MAX_RECORD_LEN) {
        return Err(StoreError::Frame {
            offset: 0,
            detail: format!("record payload of {} bytes exceeds limit", payload.len()),
        });
    }
    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserialize a frame payload back into a system.
pub fn decode_payload(payload: &[u8]) -> Result<StarSystem> {
    Ok(serde_json::from_slice(payload)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
