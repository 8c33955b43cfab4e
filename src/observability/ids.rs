//! Correlation and request identifier generation.
//!
//! # Responsibilities
//! - Generate correlation IDs (UUID v4, canonical hyphenated form)
//! - Generate request IDs for log correlation (timestamp + random suffix)
//!
//! # Design Decisions
//! - Request IDs are not cryptographically unique; collisions only require
//!   two IDs in the same millisecond with the same 9-char suffix

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Generate a fresh correlation ID.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a request ID of the form `req_<epoch-ms>_<suffix>`.
pub fn generate_request_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("req_{}_{}", now_millis(), suffix)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
