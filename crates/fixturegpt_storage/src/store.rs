//! Fixture store contract.

use fixturegpt_core::{Fingerprint, Fixture};
use std::path::PathBuf;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No fixture at the requested key
    #[error("Fixture not found: {name}-{fingerprint}")]
    NotFound {
        /// Requested name
        name: String,
        /// Requested fingerprint (hex)
        fingerprint: String,
    },

    /// Filesystem failure
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A record exists but cannot be parsed
    #[error("Corrupt fixture record {}: {reason}", path.display())]
    Corrupt {
        /// Record path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A fixture could not be encoded
    #[error("Serialization error: {reason}")]
    Serialization {
        /// Encoder message
        reason: String,
    },
}

impl StoreError {
    /// Not-found error for a key
    #[must_use]
    pub fn not_found(name: &str, fingerprint: &Fingerprint) -> Self {
        Self::NotFound {
            name: name.to_string(),
            fingerprint: fingerprint.to_hex(),
        }
    }

    /// Whether this is a lookup miss rather than a failure
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A fixture together with the size of its stored record
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFixture {
    /// The fixture
    pub fixture: Fixture,
    /// Encoded record size in bytes
    pub size_bytes: u64,
}

/// Lazy sequence of stored fixtures
pub type FixtureIter<'a> = Box<dyn Iterator<Item = StoredFixture> + 'a>;

/// Durable key-value persistence for fixtures, keyed by `(name, fingerprint)`.
///
/// Implementations hold at most one fixture per key; a later `put` replaces
/// the earlier one. Readers never observe a partially written fixture.
pub trait FixtureStore: Send + Sync {
    /// Persist a fixture, replacing any fixture at the same key
    ///
    /// # Errors
    ///
    /// Returns error if the fixture cannot be written
    fn put(&self, fixture: &Fixture) -> StoreResult<()>;

    /// Look up a fixture by key
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] on a miss, or another error if the
    /// record cannot be read
    fn get(&self, name: &str, fingerprint: &Fingerprint) -> StoreResult<Fixture>;

    /// Iterate over every stored fixture.
    ///
    /// The sequence is finite and each call starts a fresh pass. Unreadable
    /// records are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened for scanning
    fn enumerate(&self) -> StoreResult<FixtureIter<'_>>;

    /// Remove every fixture
    ///
    /// # Errors
    ///
    /// Returns error if removal fails
    fn clear(&self) -> StoreResult<()>;

    /// Number of stored fixtures
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned
    fn count(&self) -> StoreResult<usize> {
        Ok(self.enumerate()?.count())
    }
}

pub(crate) fn encode_record(fixture: &Fixture) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(fixture).map_err(|e| StoreError::Serialization {
        reason: e.to_string(),
    })
}
