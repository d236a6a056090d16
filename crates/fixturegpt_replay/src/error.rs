//! Errors the snapshot layer can add to a caller's error type.

use fixturegpt_core::Fingerprint;
use std::io;

/// A replay found no fixture and the miss policy forbids live execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No fixture recorded for {name} ({fingerprint})")]
pub struct ReplayMiss {
    /// Call label
    pub name: String,
    /// Call fingerprint
    pub fingerprint: Fingerprint,
}

impl ReplayMiss {
    /// Create a replay miss for a call
    #[must_use]
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }
}

impl From<ReplayMiss> for io::Error {
    fn from(miss: ReplayMiss) -> Self {
        io::Error::new(io::ErrorKind::NotFound, miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_miss_display() {
        let fp = Fingerprint::digest(b"call");
        let miss = ReplayMiss::new("greet", fp);
        let text = miss.to_string();
        assert!(text.contains("greet"));
        assert!(text.contains(&fp.to_hex()));
    }

    #[test]
    fn test_replay_miss_into_io_error() {
        let err: io::Error = ReplayMiss::new("greet", Fingerprint::digest(b"x")).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
