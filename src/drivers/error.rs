use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum PstatError {
    #[error("unknown current range `{0}` (expected 1uA, 10uA, 100uA or 1000uA)")]
    InvalidRange(String),
    #[error("averaging count must be greater than zero")]
    ZeroAveraging,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("temperature sensor unavailable")]
    SensorUnavailable,
    #[error("hardware i/o failed: {0}")]
    Hardware(String),
}
impl PstatError {
    /// Configuration errors are the only class allowed to stop the firmware.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PstatError::InvalidRange(_)
                | PstatError::ZeroAveraging
                | PstatError::InvalidConfiguration(_)
        )
    }
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PstatError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}
