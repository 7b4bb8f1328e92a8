use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

// Anything that can report "the remote told us to back off"
pub trait RateLimitSignal {
    // Server-reported wait, None when the failure is not a rate limit
    fn retry_after(&self) -> Option<Duration>;
}

// Convert fractional seconds to a wait, rounded up to the next millisecond
pub fn retry_after_from_secs(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis((secs * 1000.0).ceil() as u64)
}

// Failures of a single Discord REST call
#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Discord rate limited the request (retry after {retry_after}s, global: {global})")]
    RateLimited { retry_after: f64, global: bool },

    #[error("Discord rejected the credentials")]
    Unauthorized,

    #[error("Discord resource not found")]
    NotFound,

    #[error("Discord API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request to Discord failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Could not decode Discord response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DiscordError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DiscordError::RateLimited { .. } => Some(429),
            DiscordError::Unauthorized => Some(401),
            DiscordError::NotFound => Some(404),
            DiscordError::Status { status, .. } => Some(*status),
            DiscordError::Request(e) => e.status().map(|s| s.as_u16()),
            DiscordError::Decode(_) => None,
        }
    }

    // 401 and 404 both mean the bot cannot see the guild
    pub fn is_missing_access(&self) -> bool {
        matches!(self, DiscordError::Unauthorized | DiscordError::NotFound)
    }
}

impl RateLimitSignal for DiscordError {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            DiscordError::RateLimited { retry_after, .. } => Some(retry_after_from_secs(*retry_after)),
            _ => None,
        }
    }
}

// How a queued operation can end in failure
#[derive(Error, Debug)]
pub enum QueueError<E> {
    #[error("{0}")]
    Operation(E),

    #[error("gave up after {attempts} rate-limited attempts: {last}")]
    RetriesExhausted { attempts: u32, last: E },

    #[error("queued operation panicked")]
    Panicked,

    #[error("request queue is shut down")]
    Closed,
}

pub type DiscordResult<T> = Result<T, QueueError<DiscordError>>;

// Errors returned from HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Discord(#[from] QueueError<DiscordError>),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Discord(QueueError::Panicked) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Discord(QueueError::Closed) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Discord(QueueError::RetriesExhausted { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            AppError::Discord(QueueError::Operation(e)) => {
                // Pass through Discord's own status where it is meaningful
                let status = e
                    .status()
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, self.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
