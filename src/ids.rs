//! Opaque prefixed identifiers and monotonic RFC-3339 timestamps (C1).
//!
//! IDs are `{prefix}_{26 lowercase base32 chars}` built from a ULID-style
//! monotonic source so that lexicographic order matches creation order —
//! `listMessages`/`listAuditLogs` rely on this for their id tie-break.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

const ENCODE: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Monotonic counter guarding against same-millisecond collisions within one process.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate an opaque ID of the form `{prefix}_{ulid}`.
pub fn generate(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFFF;

    let mut rand_bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut rand_bytes);

    let mut buf = [0u8; 16];
    buf[0..6].copy_from_slice(&millis.to_be_bytes()[2..8]);
    buf[6..8].copy_from_slice(&(seq as u16).to_be_bytes());
    buf[8..16].copy_from_slice(&rand_bytes[0..8]);

    format!("{}_{}", prefix, encode_base32(&buf))
}

fn encode_base32(bytes: &[u8; 16]) -> String {
    // 128 bits -> 26 base32 characters (130 bits, top 2 bits unused).
    let mut out = String::with_capacity(26);
    let mut acc: u128 = 0;
    for b in bytes {
        acc = (acc << 8) | *b as u128;
    }
    acc <<= 2; // pad to a multiple of 5 bits
    for i in (0..26).rev() {
        let idx = ((acc >> (i * 5)) & 0x1F) as usize;
        out.push(ENCODE[idx] as char);
    }
    out
}

/// Current time as an RFC-3339 UTC timestamp, the wire format for all timestamps in §3.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// An 8-char uppercase invite code, drawn from the same Crockford-ish alphabet
/// as entity IDs but case-flipped so it reads distinctly in a URL.
pub fn generate_invite_code() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ENCODE[(*b as usize) & 0x1F].to_ascii_uppercase() as char)
        .collect()
}

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Entity ID prefixes, named in §3.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const SESSION: &str = "tok";
    pub const SERVER: &str = "srv";
    pub const CHANNEL: &str = "chn";
    pub const MESSAGE: &str = "msg";
    pub const THREAD: &str = "thr";
    pub const ROLE: &str = "rol";
    pub const OVERWRITE: &str = "ovr";
    pub const INVITE: &str = "inv";
    pub const FRIEND_REQUEST: &str = "frq";
    pub const MODERATION: &str = "mod";
    pub const PUSH_SUBSCRIPTION: &str = "psh";
    pub const ATTACHMENT: &str = "att";
    pub const AUDIT: &str = "adt";
    pub const WEBHOOK: &str = "whk";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_prefix() {
        let id = generate(prefix::USER);
        assert!(id.starts_with("usr_"));
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn ids_are_monotonically_increasing() {
        let a = generate(prefix::MESSAGE);
        let b = generate(prefix::MESSAGE);
        assert!(a < b, "{} should sort before {}", a, b);
    }

    #[test]
    fn ids_are_unique_under_rapid_generation() {
        let ids: Vec<_> = (0..1000).map(|_| generate(prefix::MESSAGE)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }
}
