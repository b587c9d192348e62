/// Structured error types for canteen-core.
///
/// The binary (canteen-cli) wraps these with `anyhow` context; the server
/// crate matches on them when it needs to.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for canteen-core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid TOML in {path:?}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Config could not be serialized back to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeToml(#[from] toml::ser::Error),

    /// Config file missing where one was required
    #[error("Config not found at {path:?}")]
    ConfigNotFound { path: PathBuf },

    /// One or more config values are unusable
    #[error("Invalid configuration:\n{}", .problems.join("\n"))]
    InvalidConfig { problems: Vec<String> },
}

/// Result type alias for canteen-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a TOML parse error with the offending path
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Create a config-not-found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid-config error from a single problem
    pub fn invalid(problem: impl Into<String>) -> Self {
        Self::InvalidConfig {
            problems: vec![problem.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::config_not_found("/tmp/canteen.toml");
        assert!(err.to_string().contains("/tmp/canteen.toml"));

        let err = CoreError::InvalidConfig {
            problems: vec!["  ✗ auth.jwt_secret: too short".into(), "  ✗ database.url: empty".into()],
        };
        let text = err.to_string();
        assert!(text.starts_with("Invalid configuration:"));
        assert!(text.contains("jwt_secret"));
        assert!(text.contains("database.url"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();

        assert!(matches!(err, CoreError::Io { .. }));
    }
}
