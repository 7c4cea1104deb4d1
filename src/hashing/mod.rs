//! BLAKE3 content hashing for cache keys.
//!
//! Cached embeddings are keyed by the content of the text they encode, not by artifact
//! id, so a re-ingested corpus with fresh ids still hits the cache and an edited text
//! never reuses a stale vector.

use blake3::Hasher;

/// Full 256-bit content hash of `text`, hex encoded (64 chars).
#[inline]
pub fn content_key(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for in-memory memo keys only. Persistent keys use [`content_key`].
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// 64-bit key for `(model, text)`; the separator keeps `("ab", "c")` and `("a", "bc")` apart.
#[inline]
pub fn hash_model_text(model_id: &str, text: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(model_id.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_content_key_determinism() {
        let text = "As a shopper, I want to save my cart so that I can buy later.";

        assert_eq!(content_key(text), content_key(text));
        assert_eq!(content_key(text).len(), 64);
    }

    #[test]
    fn test_content_key_is_whitespace_and_case_sensitive() {
        let texts = [
            "Given a logged-in customer",
            "given a logged-in customer",
            "Given a logged-in customer ",
            "Given a logged in customer",
        ];

        let keys: HashSet<_> = texts.iter().map(|t| content_key(t)).collect();
        assert_eq!(keys.len(), texts.len());
    }

    #[test]
    fn test_content_key_unicode() {
        let pt = content_key("Como comprador, quero receber um e-mail de confirmação");
        let en = content_key("As a buyer, I want a confirmation e-mail");
        assert_ne!(pt, en);
    }

    #[test]
    fn test_hash_to_u64_determinism() {
        let data = b"checkout-payment";
        assert_eq!(hash_to_u64(data), hash_to_u64(data));
        assert_ne!(hash_to_u64(data), hash_to_u64(b"checkout-shipping"));
    }

    #[test]
    fn test_hash_model_text_model_sensitivity() {
        let a = hash_model_text("text-embedding-3-small", "cart");
        let b = hash_model_text("text-embedding-3-large", "cart");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_model_text_separator_prevents_ambiguity() {
        let h1 = hash_model_text("ab", "cd");
        let h2 = hash_model_text("abc", "d");
        let h3 = hash_model_text("a", "bcd");

        assert_ne!(h1, h2);
        assert_ne!(h1, h3);
        assert_ne!(h2, h3);
    }
}
