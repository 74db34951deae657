//! Shared key handling for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the backend root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Prefix filter applied to every listing. Compared against the full key.
pub fn matches_prefix(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix)
}

/// Directory portion of a prefix (`vault/prod-` -> `vault`), used to narrow listings.
pub fn prefix_dir(prefix: &str) -> Option<&str> {
    prefix.rfind('/').map(|idx| &prefix[..idx]).filter(|dir| !dir.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal() {
        assert!(validate_key("raft-snapshot-1.snap").is_ok());
        assert!(validate_key("nested/raft-snapshot-1.snap").is_ok());
        assert!(matches!(validate_key("../etc/passwd"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("a/../../b"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("/etc/passwd"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn prefix_is_literal() {
        assert!(matches_prefix("vault/prod-1.snap", "vault/prod-"));
        assert!(!matches_prefix("prod-1.snap", "vault/prod-"));
        assert!(matches_prefix("anything", ""));
    }

    #[test]
    fn prefix_dir_extraction() {
        assert_eq!(prefix_dir("raft-snapshot-"), None);
        assert_eq!(prefix_dir("vault/prod-"), Some("vault"));
        assert_eq!(prefix_dir("a/b/"), Some("a/b"));
        assert_eq!(prefix_dir("/x"), None);
    }
}
