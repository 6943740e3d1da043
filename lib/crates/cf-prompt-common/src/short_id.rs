//! Human-typable package handles.
//!
//! A short id is the first [`SHORT_ID_LEN`] lowercase hex characters of the
//! SHA-256 digest of a package guid. Collisions are possible and not handled.

use sha2::{Digest, Sha256};

/// Number of hex characters in a short id.
pub const SHORT_ID_LEN: usize = 7;

/// Compute the short id for a package guid.
#[must_use]
pub fn short_id(guid: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(guid.as_bytes()));
    digest[..SHORT_ID_LEN].to_string()
}

/// Whether `candidate` names the package `guid`. Case-insensitive.
#[must_use]
pub fn matches_short_id(guid: &str, candidate: &str) -> bool {
    candidate.len() == SHORT_ID_LEN && short_id(guid).eq_ignore_ascii_case(candidate)
}
