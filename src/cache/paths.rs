// Cache path utilities.
// Locates the platform cache directory and maps cache keys to file names.

use std::path::PathBuf;

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Longest encoded key used verbatim; filesystems cap names at 255 bytes.
const MAX_ENCODED_LEN: usize = 200;

/// Readable prefix kept in front of the digest for long keys.
const HASHED_PREFIX_LEN: usize = MAX_ENCODED_LEN - 65;

/// Get the base cache directory (~/.cache/mdcache on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mdcache").map(|dirs| dirs.cache_dir().join("entries"))
}

/// File name holding the entry for `key`.
///
/// Long keys become a truncated prefix plus `~` and the SHA-256 of the full
/// key. `~` never appears in an encoded key, so hashed names cannot collide
/// with verbatim ones.
pub fn entry_file_name(key: &str) -> String {
    let encoded = encode_key(key);
    if encoded.len() <= MAX_ENCODED_LEN {
        return format!("{}.json", encoded);
    }

    // Encoded keys are ASCII, so any byte index is a char boundary
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}~{}.json", &encoded[..HASHED_PREFIX_LEN], digest)
}

/// Encode a key for use as a single path component.
/// Characters outside `[A-Za-z0-9._-]` become `%XX`, so distinct keys never collide.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            // Leading dots would make hidden files or `..`
            b'.' if !out.is_empty() => out.push('.'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("simple"), "simple");
        assert_eq!(encode_key("doc:a/b"), "doc%3Aa%2Fb");
        assert_eq!(encode_key("..hidden"), "%2E%2Ehidden");
        assert_eq!(encode_key("README.md"), "README.md");
    }

    #[test]
    fn test_encoded_keys_distinct() {
        assert_ne!(encode_key("a/b"), encode_key("a_b"));
        assert_ne!(encode_key("a:b"), encode_key("a%3Ab"));
    }

    #[test]
    fn test_entry_file_name() {
        assert_eq!(
            entry_file_name("files:phatblat/jolt/main"),
            "files%3Aphatblat%2Fjolt%2Fmain.json"
        );
    }

    #[test]
    fn test_long_key_hashed_within_name_limit() {
        let deep = "nested/".repeat(40);
        let key = format!("doc:octo/docs/main/{}README.md", deep);
        let name = entry_file_name(&key);

        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.starts_with("doc%3Aocto%2Fdocs%2Fmain%2F"));
        assert!(name.ends_with(".json"));
        assert!(name.contains('~'));
        assert_eq!(name, entry_file_name(&key));
    }

    #[test]
    fn test_long_keys_with_shared_prefix_distinct() {
        let deep = "nested/".repeat(40);
        let a = entry_file_name(&format!("doc:octo/docs/main/{}a.md", deep));
        let b = entry_file_name(&format!("doc:octo/docs/main/{}b.md", deep));

        assert_ne!(a, b);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_short_key_not_hashed() {
        assert!(!entry_file_name("doc:o/r/main/README.md").contains('~'));
    }

    #[test]
    fn test_cache_dir() {
        if let Some(dir) = cache_dir() {
            assert!(dir.ends_with("entries"));
        }
    }
}
