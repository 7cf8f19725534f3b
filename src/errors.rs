//! Error types for the analysis pipeline.
//!
//! Errors are grouped by effect: some kinds are recoverable inside the
//! orchestrator (a placeholder result is substituted and the run continues),
//! others abort the run because commit completeness can no longer be
//! guaranteed.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ChronicleError>;

#[derive(Debug, Error)]
pub enum ChronicleError {
    /// Input or decoded LLM output violates a domain invariant
    #[error("validation failed at `{path}`: {message}")]
    Validation { path: String, message: String },

    /// The tolerant decoder exhausted its transforms without producing a value
    #[error("unparseable LLM output ({input_len} bytes, last transform: {last_transform})")]
    Parse {
        input_len: usize,
        last_transform: &'static str,
    },

    /// The gateway exhausted retries or saw a non-retryable failure
    #[error("LLM call failed: {message}")]
    Llm {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A cache read or write failed; callers degrade to a cache miss
    #[error("cache I/O failed during {operation}: {source}")]
    CacheIo {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The repository reader cannot enumerate commits or produce a diff
    #[error("repository error: {0}")]
    Repository(String),

    /// Required configuration value missing or malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Artifact or other filesystem failure outside the cache
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation; unwinds the run without persisting artifacts
    #[error("run cancelled")]
    Cancelled,
}

impl ChronicleError {
    /// Shorthand for a validation failure with a field path
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an LLM failure without an underlying cause
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Repository and configuration failures are fatal: without them the
    /// no-commit-lost invariant cannot be guaranteed. Everything else is
    /// recovered locally by substituting a placeholder.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Repository(_) | Self::Configuration(_) | Self::Cancelled
        )
    }
}

impl From<git2::Error> for ChronicleError {
    fn from(e: git2::Error) -> Self {
        Self::Repository(e.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ChronicleError::Repository("boom".to_string()).is_fatal());
        assert!(ChronicleError::Configuration("missing key".to_string()).is_fatal());
        assert!(ChronicleError::Cancelled.is_fatal());
        assert!(!ChronicleError::llm("rate limited").is_fatal());
        assert!(
            !ChronicleError::Parse {
                input_len: 42,
                last_transform: "salvage"
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_validation_shorthand() {
        let err = ChronicleError::validation("changes[0].summary", "must not be empty");
        assert!(err.to_string().contains("changes[0].summary"));
    }
}
