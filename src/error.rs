use thiserror::Error;

/// Hike tracker error types
#[derive(Error, Debug)]
pub enum HikeError {
    /// Host environment offers no location source; `start()` is refused.
    #[error("No location capability available on this host")]
    NoLocationCapability,

    /// Profile data is unusable as given. The controller substitutes
    /// fallbacks and logs this instead of failing the session.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// A fix delivery failed. Surfaced as a flag, never aborts a session.
    #[error("Location signal degraded: {0}")]
    LocationSignalDegraded(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for HikeError {
    fn from(err: std::io::Error) -> Self {
        HikeError::Storage(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, HikeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HikeError::NoLocationCapability.to_string(),
            "No location capability available on this host"
        );
        let err = HikeError::InvalidProfile("stride length 0".to_string());
        assert!(err.to_string().contains("stride length 0"));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HikeError = io.into();
        assert!(matches!(err, HikeError::Storage(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: HikeError = parse.unwrap_err().into();
        assert!(matches!(err, HikeError::Serialization(_)));
    }
}
