//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request.
///
/// Entries are identified by method and full URL, query string included.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_request_key("GET", "http://localhost:3000/about");
        let key2 = compute_request_key("GET", "http://localhost:3000/about");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        assert_eq!(
            compute_request_key("get", "http://localhost:3000/"),
            compute_request_key("GET", "http://localhost:3000/")
        );
    }

    #[test]
    fn test_key_includes_query() {
        let plain = compute_request_key("GET", "http://localhost:3000/about");
        let query = compute_request_key("GET", "http://localhost:3000/about?ref=nav");
        assert_ne!(plain, query);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "http://localhost:3000/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
