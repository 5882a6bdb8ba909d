//! Content hashing for cache invalidation

use sha2::{Digest, Sha256};

/// Bumped whenever the tree format or extraction semantics change
pub const HASH_VERSION: &str = "stylebake-cache-v1";

/// Hex SHA-256 of arbitrary bytes
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of a source file under a given extraction environment.
///
/// `environment` describes everything besides the file that changes extraction
/// output (theme shape fingerprint, enumeration bindings, build target).
pub fn content_hash(environment: &str, source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HASH_VERSION.as_bytes());
    hasher.update([0u8]);
    hasher.update(environment.as_bytes());
    hasher.update([0u8]);
    hasher.update(source);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let a = content_hash("web", b"export const s = defineStyle('A', () => ({}));");
        let b = content_hash("web", b"export const s = defineStyle('A', () => ({}));");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_environment_changes_hash() {
        let source = b"const x = 1;";
        assert_ne!(content_hash("web", source), content_hash("ios", source));
        assert_ne!(content_hash("web", source), content_hash("web", b"const x = 2;"));
    }

    #[test]
    fn test_digest_known_value() {
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
