//! BLAKE3 hashing of rendered resources and whole graphs.

use serde::Serialize;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash the compact JSON rendering of a value.
///
/// Struct fields serialize in declaration order and every map in the model
/// is insertion-ordered, so equal values always hash equal.
pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(hash_string(&json))
}

/// Compute a composite hash from multiple component hashes.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_string() {
        let h1 = hash_string("hello");
        let h2 = hash_string("hello");
        let h3 = hash_string("world");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert!(h1.starts_with("blake3:"));
        assert_eq!(h1.len(), 7 + 64);
    }

    #[test]
    fn test_hash_json_stable() {
        let a = hash_json(&vec!["x", "y"]).unwrap();
        let b = hash_json(&vec!["x", "y"]).unwrap();
        let c = hash_json(&vec!["y", "x"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_composite_hash_order_sensitive() {
        let h = composite_hash(&["blake3:aaa", "blake3:bbb"]);
        let h2 = composite_hash(&["blake3:bbb", "blake3:aaa"]);
        assert!(h.starts_with("blake3:"));
        assert_ne!(h, h2);
    }

    #[test]
    fn test_composite_hash_separates_components() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(composite_hash(&["ab", "c"]), composite_hash(&["a", "bc"]));
    }
}
