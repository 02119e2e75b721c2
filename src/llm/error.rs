//! Backend error types

use std::time::Duration;
use thiserror::Error;

/// Backend error with classification
///
/// Raised by the generation client (where it plays the role of a
/// generation error) and by the content backend used for classification
/// and verification.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status when the backend answered with a non-success code
    pub status: Option<u16>,
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400 | 404 | 422 => LlmErrorKind::InvalidRequest,
            401 | 403 => LlmErrorKind::Auth,
            429 => LlmErrorKind::RateLimit,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        Self {
            status: Some(status),
            ..Self::new(kind, message)
        }
    }

    /// Classify a non-success response, honouring a `Retry-After` given in seconds
    pub fn from_response(
        status: u16,
        headers: &reqwest::header::HeaderMap,
        message: impl Into<String>,
    ) -> Self {
        let error = Self::from_status(status, message);
        let retry_after = headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        match retry_after {
            Some(secs) => error.with_retry_after(Duration::from_secs(secs)),
            None => error,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            LlmErrorKind::Timeout,
            format!("Request timed out after {}ms", after.as_millis()),
        )
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidPayload, message)
    }

    pub fn cancelled() -> Self {
        Self::new(LlmErrorKind::Cancelled, "Request cancelled")
    }

    /// Map a transport-level reqwest failure
    pub fn from_transport(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(LlmErrorKind::Timeout, format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::network(format!("Request failed: {e}"))
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == LlmErrorKind::Cancelled
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection or transport failure - retryable
    Network,
    /// Attempt exceeded its deadline - retryable
    Timeout,
    /// Rate limited (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Bad request (400) - not retryable
    InvalidRequest,
    /// Success status but the body did not carry the expected fields
    InvalidPayload,
    /// The turn was abandoned by the caller
    Cancelled,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::ServerError
        )
    }
}
