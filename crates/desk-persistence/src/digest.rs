//! Snapshot hashing for corruption detection.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of `bytes`.
pub fn compute_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Check `bytes` against an expected hex digest.
pub fn verify_digest(bytes: &[u8], expected: &str) -> bool {
    compute_digest(bytes).eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_digest() {
        // Known SHA-256 hash for "Hello, World!"
        assert_eq!(
            compute_digest(b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_verify_digest() {
        let digest = compute_digest(b"Test content");
        assert!(verify_digest(b"Test content", &digest));
        assert!(verify_digest(b"Test content", &digest.to_uppercase()));
        assert!(!verify_digest(b"Test content", "wrong_hash"));
    }
}
