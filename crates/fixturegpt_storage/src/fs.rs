//! Directory-backed fixture store.
//!
//! One JSON record per fixture, published atomically: the record is written to
//! a temporary file in the same directory and then renamed over the final
//! path, so concurrent readers see the old record or the new one.

use crate::key::FixtureKey;
use crate::store::{FixtureIter, FixtureStore, StoreError, StoreResult, StoredFixture, encode_record};
use fixturegpt_core::{Fingerprint, Fixture, Tier};
use std::fs::{self, DirEntry, ReadDir};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = ".fixture-";

/// Fixture store persisted under a single directory
#[derive(Debug, Clone)]
pub struct FsFixtureStore {
    dir: PathBuf,
}

impl FsFixtureStore {
    /// Open a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for a key
    #[must_use]
    pub fn record_path(&self, key: &FixtureKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn read_record(path: &Path) -> StoreResult<StoredFixture> {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let fixture: Fixture =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(StoredFixture {
            fixture: fixture.with_source(Tier::Local),
            size_bytes: bytes.len() as u64,
        })
    }

    fn is_record(entry: &DirEntry) -> bool {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            return false;
        };
        !name.starts_with('.')
            && FixtureKey::fingerprint_from_file_name(name).is_ok()
            && entry.file_type().is_ok_and(|t| t.is_file())
    }
}

impl FixtureStore for FsFixtureStore {
    fn put(&self, fixture: &Fixture) -> StoreResult<()> {
        let key = FixtureKey::of(fixture);
        let path = self.record_path(&key);
        let bytes = encode_record(fixture)?;

        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| StoreError::io(&self.dir, e))?;
        write_all(&mut temp, &bytes).map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        tracing::debug!(
            name = %fixture.name,
            fingerprint = %fixture.fingerprint.short(),
            path = %path.display(),
            "published fixture"
        );
        Ok(())
    }

    fn get(&self, name: &str, fingerprint: &Fingerprint) -> StoreResult<Fixture> {
        let path = self.record_path(&FixtureKey::new(name, *fingerprint));
        match Self::read_record(&path) {
            Ok(stored) if stored.fixture.is_keyed(name, fingerprint) => Ok(stored.fixture),
            Ok(stored) => Err(StoreError::Corrupt {
                path,
                reason: format!(
                    "record holds {}-{}",
                    stored.fixture.name,
                    stored.fixture.fingerprint.short()
                ),
            }),
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Err(StoreError::not_found(name, fingerprint))
            }
            Err(err) => Err(err),
        }
    }

    fn enumerate(&self) -> StoreResult<FixtureIter<'_>> {
        match fs::read_dir(&self.dir) {
            Ok(entries) => Ok(Box::new(RecordIter { entries })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Box::new(std::iter::empty())),
            Err(e) => Err(StoreError::io(&self.dir, e)),
        }
    }

    fn clear(&self) -> StoreResult<()> {
        // Only fixture records are removed; the directory may be shared.
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut removed = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            if !Self::is_record(&entry) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(entry.path(), e)),
            }
        }

        tracing::info!(dir = %self.dir.display(), removed, "cleared fixtures");
        Ok(())
    }
}

fn write_all(temp: &mut NamedTempFile, bytes: &[u8]) -> std::io::Result<()> {
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()
}

/// Lazily parses records while walking the directory
struct RecordIter {
    entries: ReadDir,
}

impl Iterator for RecordIter {
    type Item = StoredFixture;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !FsFixtureStore::is_record(&entry) {
                continue;
            }
            match FsFixtureStore::read_record(&entry.path()) {
                Ok(stored) => return Some(stored),
                Err(err) => tracing::warn!(error = %err, "skipping fixture record"),
            }
        }
        None
    }
}
