//! Verification secret generation and hashing.
//!
//! A secret is handed to the user exactly once, inside the verification link.
//! Only its SHA-256 digest is persisted, so a leaked table cannot be replayed
//! against the verify endpoint.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes per secret (256 bits of entropy).
pub const SECRET_BYTES: usize = 32;

/// A freshly generated secret and the digest to store for it.
pub struct GeneratedSecret {
    /// Hex-encoded random bytes. Never persisted.
    pub plaintext: String,
    /// SHA-256 hex digest of `plaintext`.
    pub hash: String,
}

/// Generate a new secret from the thread-local CSPRNG.
pub fn generate_secret() -> GeneratedSecret {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let plaintext = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();
    let hash = hash_secret(&plaintext);

    GeneratedSecret { plaintext, hash }
}

/// SHA-256 hex digest of a secret.
///
/// Lookups hash the presented secret and match on the digest, so the
/// comparison never touches the plaintext column by prefix.
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_64_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.plaintext.len(), SECRET_BYTES * 2);
        assert!(secret.plaintext.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stored_hash_matches_rehash_of_plaintext() {
        let secret = generate_secret();
        assert_eq!(secret.hash, hash_secret(&secret.plaintext));
        assert_ne!(secret.hash, secret.plaintext);
        assert_eq!(secret.hash.len(), 64);
    }

    #[test]
    fn consecutive_secrets_differ() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            hash_secret(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
