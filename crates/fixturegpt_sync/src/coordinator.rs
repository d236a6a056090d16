//! Tier coordination: which store a fixture is read from and written to.
//!
//! The local tier's failures are reported; the remote tier is best-effort and
//! never fails a call. Every remote problem degrades to a miss on read and a
//! skipped write on persist, with a warning in the log.

use crate::remote::{HttpRemote, RemoteError, RemoteTier};
use fixturegpt_core::{Fingerprint, Fixture, SyncConfig, SyncMode};
use fixturegpt_storage::FixtureStore;
use std::fmt;
use std::sync::Arc;

/// What consulting one tier produced
#[derive(Debug)]
enum TierOutcome {
    Hit(Fixture),
    Miss,
    Unavailable,
}

/// What writing to one tier produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The tier accepted the fixture
    Stored,
    /// The tier is configured but could not be reached or refused the write
    Failed(String),
    /// The tier is configured but absent (no credentials or bad endpoint)
    Unavailable,
}

impl WriteOutcome {
    /// Whether the fixture reached this tier
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// Per-tier result of a persist; `None` means the tier is not in use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Local tier outcome
    pub local: Option<WriteOutcome>,
    /// Remote tier outcome
    pub remote: Option<WriteOutcome>,
}

impl PersistReport {
    /// Whether at least one tier holds the fixture
    #[must_use]
    pub fn stored_anywhere(&self) -> bool {
        self.local.as_ref().is_some_and(WriteOutcome::is_stored)
            || self.remote.as_ref().is_some_and(WriteOutcome::is_stored)
    }
}

/// Routes reads and writes across the local and remote tiers
pub struct SyncCoordinator {
    sync_mode: SyncMode,
    local: Arc<dyn FixtureStore>,
    remote: Option<Arc<dyn RemoteTier>>,
}

impl SyncCoordinator {
    /// Create a coordinator over explicit tiers
    #[must_use]
    pub fn new(
        sync_mode: SyncMode,
        local: Arc<dyn FixtureStore>,
        remote: Option<Arc<dyn RemoteTier>>,
    ) -> Self {
        Self {
            sync_mode,
            local,
            remote,
        }
    }

    /// Create a coordinator from sync configuration.
    ///
    /// A remote mode without usable credentials runs without a remote tier.
    #[must_use]
    pub fn from_config(config: &SyncConfig, local: Arc<dyn FixtureStore>) -> Self {
        let remote = if config.sync_mode.uses_remote() {
            match HttpRemote::new(config) {
                Ok(remote) => Some(Arc::new(remote) as Arc<dyn RemoteTier>),
                Err(RemoteError::MissingApiKey) => {
                    tracing::warn!(
                        sync_mode = %config.sync_mode,
                        "no API key configured, remote tier disabled"
                    );
                    None
                }
                Err(err) => {
                    tracing::warn!(error = %err, "remote tier disabled");
                    None
                }
            }
        } else {
            None
        };
        Self::new(config.sync_mode, local, remote)
    }

    /// Active sync mode
    #[must_use]
    pub const fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Whether a remote tier is attached
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Local tier
    #[must_use]
    pub fn local(&self) -> &Arc<dyn FixtureStore> {
        &self.local
    }

    /// Look up a fixture, local tier first.
    ///
    /// In `both` mode a remote hit is copied into the local tier.
    #[must_use]
    pub fn fetch(&self, name: &str, fingerprint: &Fingerprint) -> Option<Fixture> {
        if self.sync_mode.uses_local() {
            if let TierOutcome::Hit(fixture) = self.read_local(name, fingerprint) {
                return Some(fixture);
            }
        }

        if self.sync_mode.uses_remote() {
            if let TierOutcome::Hit(fixture) = self.read_remote(name, fingerprint) {
                if self.sync_mode.uses_local() {
                    self.backfill(&fixture);
                }
                return Some(fixture);
            }
        }

        None
    }

    /// Write a fixture to every tier the mode names
    pub fn persist(&self, fixture: &Fixture) -> PersistReport {
        let local = self
            .sync_mode
            .uses_local()
            .then(|| self.write_local(fixture));
        let remote = self
            .sync_mode
            .uses_remote()
            .then(|| self.write_remote(fixture));
        PersistReport { local, remote }
    }

    fn read_local(&self, name: &str, fingerprint: &Fingerprint) -> TierOutcome {
        match self.local.get(name, fingerprint) {
            Ok(fixture) => TierOutcome::Hit(fixture),
            Err(err) if err.is_not_found() => TierOutcome::Miss,
            Err(err) => {
                tracing::warn!(
                    name,
                    fingerprint = %fingerprint.short(),
                    error = %err,
                    "local fixture unreadable"
                );
                TierOutcome::Unavailable
            }
        }
    }

    fn read_remote(&self, name: &str, fingerprint: &Fingerprint) -> TierOutcome {
        let Some(remote) = &self.remote else {
            return TierOutcome::Unavailable;
        };
        match remote.get(name, fingerprint) {
            Ok(Some(fixture)) => TierOutcome::Hit(fixture),
            Ok(None) => TierOutcome::Miss,
            Err(err) => {
                tracing::warn!(
                    name,
                    fingerprint = %fingerprint.short(),
                    error = %err,
                    "remote fetch failed"
                );
                TierOutcome::Unavailable
            }
        }
    }

    fn write_local(&self, fixture: &Fixture) -> WriteOutcome {
        match self.local.put(fixture) {
            Ok(()) => WriteOutcome::Stored,
            Err(err) => {
                tracing::warn!(
                    name = %fixture.name,
                    fingerprint = %fixture.fingerprint.short(),
                    error = %err,
                    "local persist failed"
                );
                WriteOutcome::Failed(err.to_string())
            }
        }
    }

    fn write_remote(&self, fixture: &Fixture) -> WriteOutcome {
        let Some(remote) = &self.remote else {
            return WriteOutcome::Unavailable;
        };
        match remote.put(fixture) {
            Ok(()) => WriteOutcome::Stored,
            Err(err) => {
                tracing::warn!(
                    name = %fixture.name,
                    fingerprint = %fixture.fingerprint.short(),
                    error = %err,
                    "remote persist failed"
                );
                WriteOutcome::Failed(err.to_string())
            }
        }
    }

    fn backfill(&self, fixture: &Fixture) {
        if self.write_local(fixture).is_stored() {
            tracing::debug!(
                name = %fixture.name,
                fingerprint = %fixture.fingerprint.short(),
                "backfilled remote fixture locally"
            );
        }
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("sync_mode", &self.sync_mode)
            .field("has_remote", &self.has_remote())
            .finish_non_exhaustive()
    }
}
