//! Core error types for FixtureGPT.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Invalid fingerprint format
    #[error("Invalid fingerprint: {reason}")]
    InvalidFingerprint {
        /// What was wrong with it
        reason: String,
    },

    /// Unrecognized configuration value
    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Offending value
        value: String,
    },

    /// Stored payload could not be decoded into the requested type
    #[error("Cannot decode payload: {reason}")]
    Decode {
        /// Decoder message
        reason: String,
    },
}

impl CoreError {
    pub(crate) fn invalid_config(key: &str, value: &str) -> Self {
        Self::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            reason: err.to_string(),
        }
    }
}
