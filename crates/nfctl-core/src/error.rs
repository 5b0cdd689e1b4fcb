//! Error types for nfctl.

use thiserror::Error;

/// Main error type for nfctl operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Required lookup data absent from configuration
    #[error("Configuration entry missing: {0}")]
    ConfigMissing(String),

    /// Relay command template could not be built
    #[error("Relay command build failed: {0}")]
    RelayBuild(String),

    /// Transport spawn or handshake failure
    #[error("Transport connect failed: {0}")]
    Connect(String),

    /// No usable data arrived within the bound
    #[error("Timeout after {0}ms waiting for remote output")]
    Timeout(u64),

    /// Operation attempted on a closed session
    #[error("Session is closed")]
    SessionClosed,

    /// Vendor validate step did not report success
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Vendor commit step did not report success
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Vendor output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_error() {
        let err = Error::ConfigMissing("target 'nf99'".to_string());
        assert_eq!(err.to_string(), "Configuration entry missing: target 'nf99'");
    }

    #[test]
    fn test_relay_build_error() {
        let err = Error::RelayBuild("unresolved placeholder {port}".to_string());
        assert_eq!(
            err.to_string(),
            "Relay command build failed: unresolved placeholder {port}"
        );
    }

    #[test]
    fn test_connect_error() {
        let err = Error::Connect("spawn failed".to_string());
        assert_eq!(err.to_string(), "Transport connect failed: spawn failed");
    }

    #[test]
    fn test_timeout_error() {
        let err = Error::Timeout(5000);
        assert_eq!(
            err.to_string(),
            "Timeout after 5000ms waiting for remote output"
        );
    }

    #[test]
    fn test_session_closed_error() {
        let err = Error::SessionClosed;
        assert_eq!(err.to_string(), "Session is closed");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::Validation("no success marker in reply".to_string());
        assert_eq!(
            err.to_string(),
            "Validation failed: no success marker in reply"
        );
    }

    #[test]
    fn test_commit_error() {
        let err = Error::Commit("commit marker absent".to_string());
        assert_eq!(err.to_string(), "Commit failed: commit marker absent");
    }

    #[test]
    fn test_parse_error() {
        let err = Error::Parse("no template matched".to_string());
        assert_eq!(err.to_string(), "Parse error: no template matched");
    }

    #[test]
    fn test_config_error() {
        let err = Error::Config("timing.poll_interval_ms must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: timing.poll_interval_ms must be > 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_other_error() {
        let err = Error::Other("unknown error".to_string());
        assert_eq!(err.to_string(), "unknown error");
    }

    #[test]
    fn test_result_type() {
        let success: Result<i32> = Ok(42);
        assert!(success.is_ok());

        let failure: Result<i32> = Err(Error::SessionClosed);
        assert!(failure.is_err());
    }
}
