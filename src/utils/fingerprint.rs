use sha2::{Digest, Sha256};

/// Deterministic cache key over an ordered list of request fields.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        // unit separator keeps ["ab", "c"] and ["a", "bc"] apart
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}
