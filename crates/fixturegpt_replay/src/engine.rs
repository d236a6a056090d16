//! Snapshot engine: decides per call whether to execute, record, or replay.
//!
//! The engine holds an immutable state (configuration plus the coordinator
//! built from it) behind an `Arc`. Reconfiguration swaps in a new state; a
//! call in flight keeps the state it started with.

use crate::call::Call;
use crate::error::ReplayMiss;
use fixturegpt_core::{Fingerprint, Fixture, MissPolicy, Mode, Payload, SnapshotConfig, SyncConfig, SyncMode};
use fixturegpt_storage::{FixtureStats, FixtureStore, FsFixtureStore, StoreResult, fixtures_named};
use fixturegpt_sync::{RemoteTier, SyncCoordinator};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

struct EngineState {
    config: SnapshotConfig,
    coordinator: SyncCoordinator,
}

impl EngineState {
    fn new(
        config: SnapshotConfig,
        local: &Arc<dyn FixtureStore>,
        remote: Option<&Arc<dyn RemoteTier>>,
    ) -> Self {
        // An injected remote replaces the HTTP client but still follows the sync mode.
        let coordinator = match remote {
            Some(remote) => SyncCoordinator::new(
                config.sync.sync_mode,
                Arc::clone(local),
                config.sync.sync_mode.uses_remote().then(|| Arc::clone(remote)),
            ),
            None => SyncCoordinator::from_config(&config.sync, Arc::clone(local)),
        };
        Self {
            config,
            coordinator,
        }
    }

    fn lookup<T: DeserializeOwned>(&self, call: &Call, fingerprint: &Fingerprint) -> Option<T> {
        let fixture = self.coordinator.fetch(call.name(), fingerprint)?;
        match fixture.response.decode::<T>() {
            Ok(value) => {
                tracing::info!(
                    name = call.name(),
                    fingerprint = %fingerprint.short(),
                    tier = %fixture.source,
                    "replaying"
                );
                Some(value)
            }
            Err(err) => {
                tracing::warn!(
                    name = call.name(),
                    fingerprint = %fingerprint.short(),
                    error = %err,
                    "stored response does not decode; treating as miss"
                );
                None
            }
        }
    }

    fn record<T>(&self, call: &Call, fingerprint: Fingerprint, value: &T)
    where
        T: Serialize + fmt::Debug,
    {
        let fixture = Fixture::with_fingerprint(
            call.name(),
            fingerprint,
            call.args().to_vec(),
            call.kwargs().clone(),
            Payload::capture(value),
        );
        let report = self.coordinator.persist(&fixture);
        if !report.stored_anywhere() {
            tracing::warn!(
                name = call.name(),
                fingerprint = %fingerprint.short(),
                "fixture was not persisted to any tier"
            );
        }
    }
}

/// Record/replay engine.
///
/// ```no_run
/// use fixturegpt_core::{Mode, SnapshotConfig};
/// use fixturegpt_replay::{Call, Snapshotter};
///
/// let engine = Snapshotter::new(SnapshotConfig::default().with_mode(Mode::Record));
/// let reply: Result<String, std::io::Error> =
///     engine.snapshot(&Call::new("greet").arg("Alice"), || Ok("hi Alice".to_string()));
/// ```
pub struct Snapshotter {
    state: RwLock<Arc<EngineState>>,
    local: Arc<dyn FixtureStore>,
    remote: Option<Arc<dyn RemoteTier>>,
}

impl Snapshotter {
    /// Engine over the directory store named by the configuration
    #[must_use]
    pub fn new(config: SnapshotConfig) -> Self {
        Self::builder(config).build()
    }

    /// Engine with injectable tiers
    #[must_use]
    pub fn builder(config: SnapshotConfig) -> SnapshotterBuilder {
        SnapshotterBuilder {
            config,
            store: None,
            remote: None,
        }
    }

    fn current(&self) -> Arc<EngineState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut SnapshotConfig),
    {
        let mut config = self.current().config.clone();
        apply(&mut config);
        let next = Arc::new(EngineState::new(config, &self.local, self.remote.as_ref()));
        tracing::info!(
            mode = %next.config.mode,
            sync_mode = %next.config.sync.sync_mode,
            remote = next.coordinator.has_remote(),
            "snapshot configuration updated"
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> SnapshotConfig {
        self.current().config.clone()
    }

    /// Set credentials and sync mode for subsequent calls
    pub fn reconfigure(&self, api_key: impl Into<String>, sync_mode: SyncMode) {
        self.configure_remote(api_key, sync_mode, None);
    }

    /// Set credentials, sync mode, and optionally the endpoint, as one change
    pub fn configure_remote(
        &self,
        api_key: impl Into<String>,
        sync_mode: SyncMode,
        endpoint: Option<&str>,
    ) {
        let api_key = api_key.into();
        self.update(|config| {
            let mut sync = std::mem::take(&mut config.sync)
                .with_api_key(api_key)
                .with_sync_mode(sync_mode);
            if let Some(endpoint) = endpoint {
                sync = sync.with_endpoint(endpoint);
            }
            config.sync = sync;
        });
    }

    /// Set the remote endpoint for subsequent calls
    pub fn set_endpoint(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        self.update(|config| config.sync.endpoint = endpoint);
    }

    /// Set the default mode for subsequent calls
    pub fn set_mode(&self, mode: Mode) {
        self.update(|config| config.mode = mode);
    }

    /// Replace the whole sync configuration for subsequent calls
    pub fn set_sync(&self, sync: SyncConfig) {
        self.update(|config| config.sync = sync);
    }

    /// Run `call` through the engine.
    ///
    /// The wrapped function's error is returned untouched. Storage and remote
    /// failures never surface; they are logged and the call proceeds.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` when it runs, or a [`ReplayMiss`] converted
    /// into `E` when replaying under [`MissPolicy::Fail`] finds nothing
    pub fn snapshot<T, E, F>(&self, call: &Call, f: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + fmt::Debug,
        E: From<ReplayMiss>,
        F: FnOnce() -> Result<T, E>,
    {
        let state = self.current();
        let mode = call.mode().unwrap_or(state.config.mode);

        match mode {
            Mode::Off => f(),
            Mode::Record => {
                let fingerprint = call.fingerprint();
                tracing::info!(name = call.name(), fingerprint = %fingerprint.short(), "recording");
                let value = f()?;
                state.record(call, fingerprint, &value);
                Ok(value)
            }
            Mode::Replay => {
                let fingerprint = call.fingerprint();
                if let Some(value) = state.lookup(call, &fingerprint) {
                    return Ok(value);
                }

                match state.config.miss_policy {
                    MissPolicy::Fail => {
                        tracing::warn!(
                            name = call.name(),
                            fingerprint = %fingerprint.short(),
                            "replay miss"
                        );
                        Err(ReplayMiss::new(call.name(), fingerprint).into())
                    }
                    MissPolicy::RecordLive => {
                        tracing::info!(
                            name = call.name(),
                            fingerprint = %fingerprint.short(),
                            "replay miss, recording live"
                        );
                        let value = f()?;
                        state.record(call, fingerprint, &value);
                        Ok(value)
                    }
                }
            }
        }
    }

    /// Statistics over the local store
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned
    pub fn stats(&self) -> StoreResult<FixtureStats> {
        let state = self.current();
        FixtureStats::collect(self.local.as_ref(), state.config.cost_per_call)
    }

    /// Every local fixture recorded under `name`, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned
    pub fn fixtures_named(&self, name: &str) -> StoreResult<Vec<Fixture>> {
        fixtures_named(self.local.as_ref(), name)
    }

    /// Remove every local fixture
    ///
    /// # Errors
    ///
    /// Returns error if removal fails
    pub fn clear(&self) -> StoreResult<()> {
        self.local.clear()
    }
}

impl fmt::Debug for Snapshotter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.current();
        f.debug_struct("Snapshotter")
            .field("config", &state.config)
            .field("coordinator", &state.coordinator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Snapshotter`]
pub struct SnapshotterBuilder {
    config: SnapshotConfig,
    store: Option<Arc<dyn FixtureStore>>,
    remote: Option<Arc<dyn RemoteTier>>,
}

impl SnapshotterBuilder {
    /// Use `store` as the local tier instead of the configured directory
    #[must_use]
    pub fn store(mut self, store: Arc<dyn FixtureStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `remote` as the remote tier instead of the HTTP client
    #[must_use]
    pub fn remote(mut self, remote: Arc<dyn RemoteTier>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Build the engine
    #[must_use]
    pub fn build(self) -> Snapshotter {
        let local: Arc<dyn FixtureStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FsFixtureStore::new(self.config.fixtures_dir.clone())),
        };
        let state = EngineState::new(self.config, &local, self.remote.as_ref());
        Snapshotter {
            state: RwLock::new(Arc::new(state)),
            local,
            remote: self.remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturegpt_storage::MemoryFixtureStore;
    use fixturegpt_sync::MemoryRemote;
    use std::cell::Cell;
    use std::io;

    fn engine(mode: Mode) -> (Snapshotter, Arc<MemoryFixtureStore>) {
        let store = Arc::new(MemoryFixtureStore::new());
        let engine = Snapshotter::builder(SnapshotConfig::default().with_mode(mode))
            .store(Arc::clone(&store) as Arc<dyn FixtureStore>)
            .build();
        (engine, store)
    }

    fn double(counter: &Cell<usize>, n: i64) -> io::Result<i64> {
        counter.set(counter.get() + 1);
        Ok(n * 2)
    }

    #[test]
    fn test_off_mode_passes_through() {
        let (engine, store) = engine(Mode::Off);
        let calls = Cell::new(0);
        let call = Call::new("double").arg(&21);

        assert_eq!(engine.snapshot(&call, || double(&calls, 21)).unwrap(), 42);
        assert_eq!(engine.snapshot(&call, || double(&calls, 21)).unwrap(), 42);
        assert_eq!(calls.get(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_then_replay() {
        let (engine, store) = engine(Mode::Record);
        let calls = Cell::new(0);
        let call = Call::new("double").arg(&21);

        assert_eq!(engine.snapshot(&call, || double(&calls, 21)).unwrap(), 42);
        assert_eq!(store.len(), 1);

        engine.set_mode(Mode::Replay);
        assert_eq!(engine.snapshot(&call, || double(&calls, 21)).unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_per_call_mode_override() {
        let (engine, store) = engine(Mode::Off);
        let calls = Cell::new(0);
        let call = Call::new("double").arg(&4).with_mode(Mode::Record);

        engine.snapshot(&call, || double(&calls, 4)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(engine.config().mode, Mode::Off);
    }

    #[test]
    fn test_callee_error_propagates_and_nothing_is_stored() {
        let (engine, store) = engine(Mode::Record);
        let result: io::Result<i64> = engine.snapshot(&Call::new("boom"), || {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream reset"))
        });

        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(store.is_empty());
    }

    #[test]
    fn test_replay_miss_records_live() {
        let (engine, store) = engine(Mode::Replay);
        let calls = Cell::new(0);
        let call = Call::new("double").arg(&5);

        assert_eq!(engine.snapshot(&call, || double(&calls, 5)).unwrap(), 10);
        assert_eq!(engine.snapshot(&call, || double(&calls, 5)).unwrap(), 10);
        assert_eq!(calls.get(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_strict_miss_policy_fails() {
        let store = Arc::new(MemoryFixtureStore::new());
        let engine = Snapshotter::builder(
            SnapshotConfig::default()
                .with_mode(Mode::Replay)
                .with_miss_policy(MissPolicy::Fail),
        )
        .store(Arc::clone(&store) as Arc<dyn FixtureStore>)
        .build();
        let calls = Cell::new(0);

        let err = engine
            .snapshot(&Call::new("double").arg(&5), || double(&calls, 5))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(calls.get(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_undecodable_fixture_is_a_miss() {
        let (engine, _store) = engine(Mode::Record);
        let call = Call::new("lookup").arg("k");
        engine
            .snapshot(&call, || Ok::<_, io::Error>("text".to_string()))
            .unwrap();

        engine.set_mode(Mode::Replay);
        let calls = Cell::new(0);
        let value: i64 = engine
            .snapshot(&call, || {
                calls.set(calls.get() + 1);
                Ok::<_, io::Error>(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_reconfigure_attaches_remote() {
        let store = Arc::new(MemoryFixtureStore::new());
        let remote = Arc::new(MemoryRemote::new());
        let engine = Snapshotter::builder(SnapshotConfig::default().with_mode(Mode::Record))
            .store(Arc::clone(&store) as Arc<dyn FixtureStore>)
            .remote(Arc::clone(&remote) as Arc<dyn RemoteTier>)
            .build();
        let calls = Cell::new(0);

        engine.snapshot(&Call::new("double").arg(&1), || double(&calls, 1)).unwrap();
        assert_eq!(remote.put_calls(), 0);

        engine.reconfigure("fgpt_key", SyncMode::Both);
        assert!(engine.config().sync.has_api_key());
        engine.snapshot(&Call::new("double").arg(&2), || double(&calls, 2)).unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_configure_remote_is_one_update() {
        let store = Arc::new(MemoryFixtureStore::new());
        let remote = Arc::new(MemoryRemote::new());
        let engine = Snapshotter::builder(SnapshotConfig::default().with_mode(Mode::Record))
            .store(Arc::clone(&store) as Arc<dyn FixtureStore>)
            .remote(Arc::clone(&remote) as Arc<dyn RemoteTier>)
            .build();

        engine.configure_remote("fgpt_key", SyncMode::Cloud, Some("https://fixtures.example.com"));
        let config = engine.config();
        assert!(config.sync.has_api_key());
        assert_eq!(config.sync.sync_mode, SyncMode::Cloud);
        assert_eq!(config.sync.endpoint, "https://fixtures.example.com");

        engine.configure_remote("fgpt_other", SyncMode::Both, None);
        assert_eq!(engine.config().sync.endpoint, "https://fixtures.example.com");
        assert_eq!(engine.config().sync.masked_api_key().as_deref(), Some("fgpt_oth..."));
    }

    #[test]
    fn test_set_endpoint_and_sync() {
        let (engine, _store) = engine(Mode::Off);
        engine.set_endpoint("https://fixtures.internal.example");
        assert_eq!(engine.config().sync.endpoint, "https://fixtures.internal.example");

        engine.set_sync(SyncConfig::local().with_sync_mode(SyncMode::Cloud));
        assert_eq!(engine.config().sync.sync_mode, SyncMode::Cloud);
        assert_eq!(engine.config().sync.endpoint, fixturegpt_core::config::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_stats_and_clear() {
        let (engine, _store) = engine(Mode::Record);
        let calls = Cell::new(0);
        for n in 0..3 {
            engine.snapshot(&Call::new("double").arg(&n), || double(&calls, n)).unwrap();
        }

        let stats = engine.stats().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(engine.fixtures_named("double").unwrap().len(), 3);

        engine.clear().unwrap();
        assert!(engine.stats().unwrap().is_empty());
    }
}
