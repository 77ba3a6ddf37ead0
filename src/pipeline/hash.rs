//! Deterministic identifiers for notes and attachments.
//!
//! Identifiers are SHA-256 fingerprints of a small canonical JSON object,
//! truncated to [`ID_LEN`] hex characters. The object only holds fields that
//! never change for a given source note, so re-running an import over the
//! same archive yields the same identifiers and reconciliation can match
//! them against the destination.
//!
//! The canonical text is written out with a fixed key order rather than
//! through a JSON map, so it cannot drift with map ordering features.
//! Changing it orphans every previously imported row.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
pub const ID_LEN: usize = 16;

/// SHA-256 of canonical text, as lowercase hex.
#[must_use]
pub fn content_hash(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn short(canonical: &str) -> String {
    let mut hash = content_hash(canonical);
    hash.truncate(ID_LEN);
    hash
}

/// A JSON string literal, escaped.
fn quoted(text: &str) -> String {
    Value::from(text).to_string()
}

/// Identifier of a note: title plus creation time.
///
/// Flags, labels and body text are excluded, so editing those in the source
/// does not create a second destination row.
#[must_use]
pub fn note_id(title: &str, created_usec: i64) -> String {
    short(&format!(
        r#"{{"created_usec":{created_usec},"title":{}}}"#,
        quoted(title)
    ))
}

/// Identifier of an attachment: owning note plus file path or URL.
#[must_use]
pub fn attachment_id(note_id: &str, source: &str) -> String {
    short(&format!(
        r#"{{"note_id":{},"source":{}}}"#,
        quoted(note_id),
        quoted(source)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_identifiers_pinned() {
        assert_eq!(note_id("Groceries", 1000), "8df66568342cb7f9");
        assert_eq!(attachment_id("8df66568342cb7f9", "IMG_1.jpg"), "1ac8dc1f240e491f");
        assert_eq!(note_id("Say \"hi\"", 1), "176b23cac4c82830");
    }

    #[test]
    fn test_note_id_stable() {
        let id = note_id("Groceries", 1_600_000_000_000_000);
        assert_eq!(id, note_id("Groceries", 1_600_000_000_000_000));
        assert_eq!(id.len(), ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_note_id_distinguishes_inputs() {
        let base = note_id("Groceries", 1);
        assert_ne!(base, note_id("Groceries", 2));
        assert_ne!(base, note_id("groceries", 1));
    }

    #[test]
    fn test_attachment_id_scoped_to_note() {
        let a = attachment_id(&note_id("A", 1), "photo.png");
        let b = attachment_id(&note_id("B", 1), "photo.png");
        assert_ne!(a, b);
        assert_eq!(a, attachment_id(&note_id("A", 1), "photo.png"));
    }
}
