//! Server configuration, built from environment variables.

use std::time::Duration;

/// Origins allowed to call the API when `MAILSIGHT_ALLOWED_ORIGINS` is not
/// set: the deployed dashboard and local dev.
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://email-parser-imap.netlify.app",
    "http://localhost:8080",
];

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_IMAP_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// CORS origin allow-list.
    pub allowed_origins: Vec<String>,
    /// Socket read/write timeout for IMAP sessions; also the base of the
    /// per-request deadline.
    pub imap_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            imap_timeout: Duration::from_secs(DEFAULT_IMAP_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("MAILSIGHT_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let allowed_origins = std::env::var("MAILSIGHT_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.allowed_origins);

        let imap_timeout = std::env::var("MAILSIGHT_IMAP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.imap_timeout);

        Self {
            port,
            allowed_origins,
            imap_timeout,
        }
    }
}
