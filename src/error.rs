//! Error types for Bakery
//!
//! All modules use `BakeryResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Bakery operations
pub type BakeryResult<T> = Result<T, BakeryError>;

/// All errors that can occur in Bakery
#[derive(Error, Debug)]
pub enum BakeryError {
    // Configuration errors
    #[error("Authfile not found: {0}")]
    AuthfileNotFound(PathBuf),

    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Invalid version track '{track}' for {arg}: expected owner/repo or owner/repo@branch")]
    TrackInvalid { arg: String, track: String },

    // Declaration errors
    #[error("Missing containerfile: {0}")]
    MissingContainerfile(PathBuf),

    #[error("Image {0} declared with no pushspecs")]
    NoPushspecs(String),

    // Network errors
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Unexpected response from {url}: {reason}")]
    ApiResponse { url: String, reason: String },

    // Process errors
    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with status {code}: {command}")]
    CommandStatus { command: String, code: i32 },

    #[error("Command produced no usable output: {command}")]
    CommandOutput { command: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BakeryError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an HTTP error
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::AuthfileNotFound(_) => Some("Pass --authfile with a registry auth file, or omit it to skip pushing"),
            Self::ManifestNotFound(_) => Some("Pass --manifest or create bakery.toml in the current directory"),
            Self::Http { .. } => Some("Check network access, or set GITHUB_TOKEN to avoid rate limits"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BakeryError::MissingContainerfile(PathBuf::from("toolbox/Containerfile"));
        assert!(err.to_string().contains("toolbox/Containerfile"));
    }

    #[test]
    fn error_hint() {
        let err = BakeryError::ManifestNotFound(PathBuf::from("bakery.toml"));
        assert!(err.hint().unwrap().contains("--manifest"));
        assert!(BakeryError::NoPushspecs("img".into()).hint().is_none());
    }
}
