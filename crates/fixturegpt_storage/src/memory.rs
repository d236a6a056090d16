//! In-process fixture store.

use crate::key::FixtureKey;
use crate::store::{FixtureIter, FixtureStore, StoreError, StoreResult, StoredFixture, encode_record};
use fixturegpt_core::{Fingerprint, Fixture};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Fixture store held in memory; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryFixtureStore {
    fixtures: RwLock<BTreeMap<FixtureKey, Fixture>>,
}

impl MemoryFixtureStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fixtures held
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FixtureStore for MemoryFixtureStore {
    fn put(&self, fixture: &Fixture) -> StoreResult<()> {
        self.fixtures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(FixtureKey::of(fixture), fixture.clone());
        Ok(())
    }

    fn get(&self, name: &str, fingerprint: &Fingerprint) -> StoreResult<Fixture> {
        self.fixtures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&FixtureKey::new(name, *fingerprint))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name, fingerprint))
    }

    fn enumerate(&self) -> StoreResult<FixtureIter<'_>> {
        // Snapshot under the lock so iteration never holds it.
        let fixtures: Vec<Fixture> = self
            .fixtures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        Ok(Box::new(fixtures.into_iter().filter_map(|fixture| {
            let size_bytes = encode_record(&fixture).ok()?.len() as u64;
            Some(StoredFixture {
                fixture,
                size_bytes,
            })
        })))
    }

    fn clear(&self) -> StoreResult<()> {
        self.fixtures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
