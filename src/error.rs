//! Error types for Mailsight.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IMAP error: {0}")]
    Imap(#[from] ImapError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from one IMAP session run.
///
/// Variants map one-to-one onto the connect endpoint's error responses:
/// everything up to and including LOGIN is `Connect`, mailbox selection is
/// `InboxOpen`, and everything after the fetch is issued is `Fetch`.
#[derive(Debug, thiserror::Error)]
pub enum ImapError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to open inbox: {0}")]
    InboxOpen(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Session timed out after {0:?}")]
    Timeout(Duration),
}

/// Analysis provider errors.
///
/// Unparseable model output is deliberately NOT an error — it degrades to
/// the default neutral analysis in `analysis::parse_analysis`.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response from analysis provider: {0}")]
    InvalidResponse(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
