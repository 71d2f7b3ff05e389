use thiserror::Error;

/// Run tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Sensor failed: {0}")]
    SensorFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: TrackerError = io.into();
        assert!(matches!(err, TrackerError::StorageError(ref msg) if msg.contains("read-only")));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(TrackerError::NotRunning.to_string(), "Session not running");
        assert_eq!(
            TrackerError::InvalidParameters("segment_size_m".into()).to_string(),
            "Invalid parameters: segment_size_m"
        );
    }
}
