//! Error types for font evidence collection and the webfonts audit

use thiserror::Error;

/// Result type alias for gatherer and audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while gathering font evidence or running the audit
///
/// Sparse data (unreachable stylesheets, fonts without a matching rule) is
/// never reported through this type; only upstream failures are.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the browser backend
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The in-page script threw or the evaluation channel rejected it
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// A script returned a value that does not match its expected shape
    #[error("Invalid payload from {script}: {reason}")]
    InvalidPayload { script: &'static str, reason: String },

    /// Network records or trace timestamps could not be provided
    #[error("Artifact unavailable: {0}")]
    ArtifactError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_payload_names_the_script() {
        let err = Error::InvalidPayload {
            script: "LoadedFonts",
            reason: "expected array".into(),
        };
        assert_eq!(err.to_string(), "Invalid payload from LoadedFonts: expected array");
    }
}
