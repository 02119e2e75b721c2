//! Backend abstraction
//!
//! Two contracts are used by the pipeline: plain prompt-in/text-out
//! generation against the primary backend, and the generate-with-tools
//! content contract used for classification and grounded verification.

mod error;
mod gemini;
mod generation;
pub mod retry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiService, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use generation::{HttpGenerationClient, DEFAULT_MAX_NEW_TOKENS};
pub use retry::{run_with_policy, RetryPolicy};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Primary text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for the prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Identifier used in logs
    fn name(&self) -> &str;
}

/// Content backend supporting tool declarations and system instructions
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(&self, request: &ContentRequest)
        -> Result<ContentResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Stand-in content backend used when no API key is configured
///
/// Every call fails, which the classifier turns into an opinion and the
/// verifier into an unavailable notice.
pub struct UnconfiguredContentGenerator;

#[async_trait]
impl ContentGenerator for UnconfiguredContentGenerator {
    async fn generate_content(
        &self,
        _request: &ContentRequest,
    ) -> Result<ContentResponse, LlmError> {
        Err(LlmError::new(
            LlmErrorKind::Auth,
            "Content backend not configured (set GEMINI_API_KEY)",
        ))
    }

    fn model_id(&self) -> &str {
        "unconfigured"
    }
}

/// Logging wrapper for backend services
pub struct LoggingService<T: ?Sized> {
    inner: Arc<T>,
    name: String,
}

impl<T: ?Sized> LoggingService<T> {
    pub fn new(inner: Arc<T>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }
}

fn log_outcome<V>(backend: &str, start: std::time::Instant, result: &Result<V, LlmError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                backend = %backend,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) if e.is_cancelled() => {
            tracing::info!(
                backend = %backend,
                duration_ms = %duration.as_millis(),
                "Backend request cancelled"
            );
        }
        Err(e) => {
            tracing::error!(
                backend = %backend,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                status = ?e.status,
                retryable = e.kind.is_retryable(),
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for LoggingService<T> {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(prompt).await;
        log_outcome(&self.name, start, &result);
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<T: ContentGenerator + ?Sized> ContentGenerator for LoggingService<T> {
    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<ContentResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_content(request).await;
        log_outcome(&self.name, start, &result);
        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
