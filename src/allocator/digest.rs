//! Stable digest of an allocation key.
//!
//! Keccak-256 over `project ++ environment`. Output does not depend on the
//! platform, the process or the Rust version.

use crate::config;
use tiny_keccak::{Hasher, Keccak};

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Keccak-256 of the concatenated key.
pub fn key_digest(project: &str, environment: &str) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(project.as_bytes());
    hasher.update(environment.as_bytes());
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    digest
}

/// First 64 bits of the digest, big endian.
pub fn digest_prefix(digest: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Hex rendering, for logs and structured output.
pub fn digest_hex(project: &str, environment: &str) -> String {
    hex::encode(key_digest(project, environment))
}

/// 13 lowercase base32 characters rendered from the first 64 bits of the digest.
///
/// Used as a globally unique resource name suffix.
pub fn unique_string(project: &str, environment: &str) -> String {
    let value = digest_prefix(&key_digest(project, environment));
    (0..config::UNIQUE_STRING_LEN)
        .map(|i| {
            let shift = 5 * (config::UNIQUE_STRING_LEN - 1 - i);
            BASE32_ALPHABET[((value >> shift) & 0x1f) as usize] as char
        })
        .collect()
}
