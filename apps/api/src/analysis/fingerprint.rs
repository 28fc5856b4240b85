//! Content fingerprints — the cache key for analysis results.
//!
//! A fingerprint is the lowercase-hex SHA-256 of the raw text, exactly as
//! submitted. No normalization: case and whitespace are significant, so
//! identical text always maps to the same key and a one-character edit
//! produces a different key with overwhelming probability.

use sha2::{Digest, Sha256};

/// 64-char lowercase hex SHA-256 digest of `text`.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(fingerprint("resume text"), fingerprint("resume text"));
    }

    #[test]
    fn test_known_digest() {
        // `echo -n "" | sha256sum`
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_single_char_difference_changes_digest() {
        assert_ne!(fingerprint("resume A"), fingerprint("resume B"));
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(fingerprint("Rust"), fingerprint("rust"));
    }

    #[test]
    fn test_whitespace_sensitive() {
        assert_ne!(fingerprint("a b"), fingerprint("a  b"));
        assert_ne!(fingerprint("a b"), fingerprint("a b "));
    }

    #[test]
    fn test_fixed_length_hex() {
        let digest = fingerprint("any text at all");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }
}
