//! Error types for form sessions.
//!
//! Covers loading schemas and configuration from disk as well as every
//! engine failure a session can surface.

use generator_form_core::{FormError, NormalizationError, ParseError};
use thiserror::Error;

/// Errors that can occur while driving a form session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The schema document was rejected by the normalizer.
    #[error("invalid schema: {0}")]
    Normalization(#[from] NormalizationError),

    /// An edit named a field the schema does not declare.
    #[error(transparent)]
    Form(#[from] FormError),

    /// A command line could not be parsed for the current schema.
    #[error("invalid invocation: {0}")]
    Parse(#[from] ParseError),

    /// The language service could not be reached for a workspace.
    #[error("failed to connect language service for {workspace}: {reason}")]
    Connect { workspace: String, reason: String },

    /// The schema file extension is neither JSON nor YAML.
    #[error("unsupported schema format: {0}")]
    UnsupportedFormat(String),
}

/// Convenience alias for results with [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;
