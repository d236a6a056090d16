//! Fixture addressing.

use fixturegpt_core::{CoreError, CoreResult, Fingerprint, Fixture};
use std::fmt;

/// Extension of a published fixture record
pub const RECORD_EXTENSION: &str = "json";

/// Longest name prefix kept in a record file name, in characters.
/// Keeps `<prefix>-<64 hex>.json` under the 255-byte file name limit.
pub const MAX_NAME_PREFIX: usize = 100;

/// Identity of a fixture: `(name, fingerprint)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureKey {
    /// Call label
    pub name: String,
    /// Call fingerprint
    pub fingerprint: Fingerprint,
}

impl FixtureKey {
    /// Create a new fixture key
    #[must_use]
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }

    /// Key of an existing fixture
    #[must_use]
    pub fn of(fixture: &Fixture) -> Self {
        Self::new(fixture.name.clone(), fixture.fingerprint)
    }

    /// File name the record is published under: `<name>-<fingerprint>.json`.
    ///
    /// The name part is sanitized and cut to [`MAX_NAME_PREFIX`] characters;
    /// the fingerprint already covers the raw name, so distinct keys never
    /// share a file.
    #[must_use]
    pub fn file_name(&self) -> String {
        let prefix: String = sanitize_name(&self.name)
            .chars()
            .take(MAX_NAME_PREFIX)
            .collect();
        format!(
            "{}-{}.{}",
            prefix,
            self.fingerprint.to_hex(),
            RECORD_EXTENSION
        )
    }

    /// Recover the fingerprint part of a record file name
    ///
    /// # Errors
    ///
    /// Returns error if the file name is not a fixture record
    pub fn fingerprint_from_file_name(file_name: &str) -> CoreResult<Fingerprint> {
        let stem = file_name
            .strip_suffix(RECORD_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| CoreError::InvalidFingerprint {
                reason: format!("not a fixture record: {file_name}"),
            })?;
        let (_, hex) = stem
            .rsplit_once('-')
            .ok_or_else(|| CoreError::InvalidFingerprint {
                reason: format!("missing fingerprint in {file_name}"),
            })?;
        Fingerprint::from_hex(hex)
    }
}

impl fmt::Display for FixtureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.fingerprint.short())
    }
}

/// Replace characters that are unsafe in file names with `_`
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Leading dots would hide the record and collide with temp files.
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_layout() {
        let fp = Fingerprint::digest(b"greet");
        let key = FixtureKey::new("greet", fp);
        assert_eq!(key.file_name(), format!("greet-{}.json", fp.to_hex()));
    }

    #[test]
    fn test_file_name_round_trips_fingerprint() {
        let fp = Fingerprint::digest(b"x");
        let key = FixtureKey::new("user-summary", fp);
        let parsed = FixtureKey::fingerprint_from_file_name(&key.file_name()).unwrap();
        assert_eq!(parsed, fp);
    }

    #[test]
    fn test_long_name_is_cut_to_prefix() {
        let fp = Fingerprint::digest(b"long");
        let key = FixtureKey::new("n".repeat(300), fp);
        let file_name = key.file_name();
        assert!(file_name.len() <= 255);
        assert_eq!(
            file_name,
            format!("{}-{}.json", "n".repeat(MAX_NAME_PREFIX), fp.to_hex())
        );
        assert_eq!(FixtureKey::fingerprint_from_file_name(&file_name).unwrap(), fp);
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert!(FixtureKey::fingerprint_from_file_name("notes.txt").is_err());
        assert!(FixtureKey::fingerprint_from_file_name("greet.json").is_err());
        assert!(FixtureKey::fingerprint_from_file_name("greet-zz.json").is_err());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("openai/chat completion"), "openai_chat_completion");
        assert_eq!(sanitize_name("v1.search-docs"), "v1.search-docs");
        assert_eq!(sanitize_name("../etc"), "_etc");
        assert_eq!(sanitize_name("..."), "_");
        assert_eq!(sanitize_name(""), "_");
    }
}
