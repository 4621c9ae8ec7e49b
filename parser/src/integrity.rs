//! Assertion integrity for test-specification documents.
//!
//! The hash covers only the Given/When/Then lines, whitespace-normalized and
//! sorted, so it survives reformatting and reordering of scenarios but
//! changes with any wording edit.

use serde::Serialize;
use sha2::{Digest, Sha256};

const ASSERTION_MARKERS: &[&str] = &["**Given**:", "**When**:", "**Then**:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    Valid,
    Tampered,
    Missing,
}

impl IntegrityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            IntegrityStatus::Valid => "valid",
            IntegrityStatus::Tampered => "tampered",
            IntegrityStatus::Missing => "missing",
        }
    }
}

/// Integrity verdict plus both hashes it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityCheck {
    pub status: IntegrityStatus,
    pub current_hash: Option<String>,
    pub stored_hash: Option<String>,
}

impl IntegrityCheck {
    pub fn missing() -> Self {
        Self {
            status: IntegrityStatus::Missing,
            current_hash: None,
            stored_hash: None,
        }
    }
}

/// Lowercase hex SHA-256 over the sorted, normalized assertion lines.
///
/// Returns `None` for absent content or content without assertions.
pub fn compute_assertion_hash(content: Option<&str>) -> Option<String> {
    let content = content?;
    let mut assertions: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| ASSERTION_MARKERS.iter().any(|marker| line.starts_with(marker)))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    if assertions.is_empty() {
        return None;
    }
    assertions.sort();

    let digest = Sha256::digest(assertions.join("\n").as_bytes());
    Some(hex::encode(digest))
}

/// Compare a freshly computed hash against the recorded one.
pub fn check_integrity(current_hash: Option<&str>, stored_hash: Option<&str>) -> IntegrityCheck {
    let status = match (current_hash, stored_hash) {
        (Some(current), Some(stored)) if current == stored => IntegrityStatus::Valid,
        (Some(_), Some(_)) => IntegrityStatus::Tampered,
        _ => IntegrityStatus::Missing,
    };
    IntegrityCheck {
        status,
        current_hash: current_hash.map(str::to_string),
        stored_hash: stored_hash.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SPECS: &str = "### TS-001: Login

**Given**: a user with valid credentials
**When**: they submit the login form
**Then**: they are redirected to dashboard

### TS-002: Logout

**Given**: a signed-in user
**When**: they click logout
**Then**: the session ends
";

    #[test]
    fn absent_or_assertion_free_content_has_no_hash() {
        assert_eq!(compute_assertion_hash(None), None);
        assert_eq!(compute_assertion_hash(Some("no assertions here")), None);
        assert_eq!(compute_assertion_hash(Some("")), None);
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let hash = compute_assertion_hash(Some(SPECS)).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn hash_ignores_whitespace_reformatting() {
        let reformatted = SPECS
            .replace("**Given**: a user", "  **Given**:   a    user")
            .replace("they click logout", "they\tclick   logout  ");
        assert_eq!(
            compute_assertion_hash(Some(SPECS)),
            compute_assertion_hash(Some(&reformatted))
        );
    }

    #[test]
    fn hash_ignores_scenario_order() {
        let (first, second) = SPECS.split_at(SPECS.find("### TS-002").unwrap());
        let reordered = format!("{second}\n{first}");
        assert_eq!(
            compute_assertion_hash(Some(SPECS)),
            compute_assertion_hash(Some(&reordered))
        );
    }

    #[test]
    fn hash_changes_with_wording() {
        let weakened = SPECS.replace("the session ends", "the session may end");
        assert_ne!(
            compute_assertion_hash(Some(SPECS)),
            compute_assertion_hash(Some(&weakened))
        );
    }

    #[test]
    fn ignores_non_assertion_lines() {
        let annotated = SPECS.replace("### TS-002: Logout", "### TS-002: Sign out\n\nNotes.");
        assert_eq!(
            compute_assertion_hash(Some(SPECS)),
            compute_assertion_hash(Some(&annotated))
        );
    }

    #[test]
    fn three_way_check() {
        assert_eq!(check_integrity(Some("abc"), Some("abc")).status, IntegrityStatus::Valid);
        assert_eq!(
            check_integrity(Some("abc"), Some("def")).status,
            IntegrityStatus::Tampered
        );
        assert_eq!(check_integrity(Some("abc"), None).status, IntegrityStatus::Missing);
        assert_eq!(check_integrity(None, Some("abc")).status, IntegrityStatus::Missing);
        assert_eq!(check_integrity(None, None), IntegrityCheck::missing());
    }

    #[test]
    fn check_echoes_both_hashes() {
        let check = check_integrity(Some("abc"), Some("def"));
        assert_eq!(check.current_hash.as_deref(), Some("abc"));
        assert_eq!(check.stored_hash.as_deref(), Some("def"));
    }
}
