//! HTTP surface: the connect endpoint, analysis endpoint, and CORS layer.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::analysis::AnalysisClient;
use crate::config::ServerConfig;
use crate::error::{ConfigError, ImapError};
use crate::imap::session;
use crate::imap::transport::ConnectionDescriptor;
use crate::record::EmailRecord;
use crate::score::ScoringStrategy;

/// Slack added to the per-request deadline so socket-level timeouts (which
/// carry phase information) usually surface before the outer one.
const REQUEST_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<dyn ScoringStrategy>,
    /// Analysis client (None if no provider key is configured).
    pub analysis: Option<Arc<AnalysisClient>>,
    pub imap_timeout: Duration,
}

/// Build the router with all routes and the CORS allow-list applied.
pub fn app(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(&config.allowed_origins)?;
    Ok(Router::new()
        .route("/", get(liveness))
        .route("/api/test-cors", get(test_cors))
        .route("/connect", post(connect))
        .route("/api/connect", post(connect))
        .route("/api/analyze", post(analyze))
        .layer(cors)
        .with_state(state))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let mut list = Vec::with_capacity(origins.len());
    for origin in origins {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MAILSIGHT_ALLOWED_ORIGINS".into(),
                message: format!("{origin}: {e}"),
            })?;
        list.push(value);
    }
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

// ── Liveness ────────────────────────────────────────────────────────

async fn liveness() -> &'static str {
    "Mailsight backend is running"
}

async fn test_cors() -> impl IntoResponse {
    Json(serde_json::json!({"message": "CORS is working!"}))
}

// ── Connect ─────────────────────────────────────────────────────────

/// Connection credentials, exactly as the dashboard posts them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub email: String,
    pub password: String,
    pub imap_host: String,
    pub imap_port: u16,
    #[serde(rename = "useSSL")]
    pub use_ssl: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub emails: Vec<EmailRecord>,
}

async fn connect(State(state): State<AppState>, Json(req): Json<ConnectRequest>) -> Response {
    let desc = ConnectionDescriptor {
        host: req.imap_host,
        port: req.imap_port,
        username: req.email,
        password: secrecy::SecretString::from(req.password),
        use_ssl: req.use_ssl,
    };
    info!(host = %desc.host, port = desc.port, user = %desc.username, "connect requested");

    let scoring = Arc::clone(&state.scoring);
    let timeout = state.imap_timeout;
    let session_desc = desc.clone();
    let task =
        tokio::task::spawn_blocking(move || session::fetch_inbox(&session_desc, scoring.as_ref(), timeout));

    let outcome = match tokio::time::timeout(timeout + REQUEST_TIMEOUT_GRACE, task).await {
        Err(_elapsed) => Err(ImapError::Timeout(timeout)),
        Ok(Err(join_err)) => {
            warn!(error = %join_err, "session task failed");
            return server_error();
        }
        Ok(Ok(result)) => result,
    };

    match outcome {
        Ok(emails) => {
            info!(host = %desc.host, count = emails.len(), "fetch complete");
            (
                StatusCode::OK,
                Json(ConnectResponse {
                    success: true,
                    emails,
                }),
            )
                .into_response()
        }
        Err(err) => imap_error_response(err),
    }
}

/// Map a session error onto the endpoint's fixed error strings. Raw
/// protocol detail goes to the log, never to the client.
fn imap_error_response(err: ImapError) -> Response {
    warn!(error = %err, "imap session failed");
    let message = match &err {
        ImapError::InboxOpen(_) => "Failed to open inbox",
        ImapError::Fetch(_) => "Failed to fetch emails",
        ImapError::Connect(_) | ImapError::Timeout(_) => "Failed to connect to email server",
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": message})),
    )
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Server error"})),
    )
        .into_response()
}

// ── Analyze ─────────────────────────────────────────────────────────

async fn analyze(State(state): State<AppState>, Json(email): Json<EmailRecord>) -> Response {
    let Some(client) = state.analysis else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Analysis is not configured"})),
        )
            .into_response();
    };

    match client.analyze(&email).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            warn!(error = %err, email = %email.id, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to analyze email"})),
            )
                .into_response()
        }
    }
}
