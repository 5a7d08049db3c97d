/// HMAC-SHA256 primitives shared by download links and fulfillment callbacks
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes
pub const MAC_LEN: usize = 32;

/// Maximum allowed clock difference for signed callbacks (seconds)
/// Anything older or further in the future is treated as a replay
pub const TIMESTAMP_TOLERANCE: i64 = 300; // 5 minutes

/// Compute the raw HMAC-SHA256 tag of `data` under `key`
pub fn mac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; MAC_LEN], String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| format!("Invalid secret key: {}", e))?;

    mac.update(data);

    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Generate HMAC-SHA256 signature
///
/// # Returns
/// Lowercase hex-encoded signature string (64 characters)
pub fn create_signature(data: &[u8], key: &[u8]) -> Result<String, String> {
    mac_sha256(key, data).map(hex::encode)
}

/// Compare two byte strings without short-circuiting on the first difference
///
/// Unequal lengths are rejected up front; the length of a MAC is public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Decode a signature that must be lowercase hex
///
/// `hex::decode` also accepts uppercase digits, which would let two distinct
/// strings stand for the same tag.
pub fn decode_lowercase_hex(encoded: &str) -> Option<Vec<u8>> {
    let well_formed = encoded
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    if !well_formed {
        return None;
    }

    hex::decode(encoded).ok()
}

/// Verify a hex HMAC-SHA256 signature in constant time
///
/// Malformed input of any kind resolves to `false`.
pub fn verify_signature(data: &[u8], key: &[u8], signature: &str) -> bool {
    let supplied = match decode_lowercase_hex(signature) {
        Some(bytes) => bytes,
        None => return false,
    };

    let expected = match mac_sha256(key, data) {
        Ok(tag) => tag,
        Err(e) => {
            log::error!("Failed to compute signature: {}", e);
            return false;
        }
    };

    constant_time_eq(&supplied, &expected)
}

/// Validate a callback timestamp against the replay window
pub fn validate_timestamp(timestamp: i64) -> bool {
    validate_timestamp_at(timestamp, chrono::Utc::now().timestamp())
}

pub fn validate_timestamp_at(timestamp: i64, now: i64) -> bool {
    let diff = now.saturating_sub(timestamp).saturating_abs();

    if diff > TIMESTAMP_TOLERANCE {
        log::warn!(
            "Timestamp validation failed: diff={} seconds (tolerance={} seconds)",
            diff,
            TIMESTAMP_TOLERANCE
        );
        return false;
    }

    true
}

/// Generate a cryptographically secure random secret
///
/// # Returns
/// 64-character hex string (32 bytes of entropy)
pub fn generate_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    hex::encode(bytes)
}

/// Bytes covered by a fulfillment callback signature: `"{timestamp}.{body}"`
pub fn construct_callback_payload(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let prefix = format!("{}.", timestamp);
    let mut payload = Vec::with_capacity(prefix.len() + body.len());
    payload.extend_from_slice(prefix.as_bytes());
    payload.extend_from_slice(body);
    payload
}
