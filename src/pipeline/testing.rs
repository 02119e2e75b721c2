//! Mock backends for testing
//!
//! These mocks enable pipeline tests without real I/O.

use crate::llm::{ContentGenerator, ContentRequest, ContentResponse, LlmError, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock text generator
// ============================================================================

/// Generation backend that returns queued replies
pub struct MockTextGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    /// Record of all prompts received
    pub prompts: Mutex<Vec<String>>,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Generator that sleeps before answering, so a turn stays in flight
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.request_started.notify_one();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
    }

    fn name(&self) -> &str {
        "mock-generation"
    }
}

// ============================================================================
// Mock content generator
// ============================================================================

/// Content backend that returns queued responses
pub struct MockContentGenerator {
    responses: Mutex<VecDeque<Result<ContentResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ContentRequest>>,
}

impl MockContentGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: ContentResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<ContentResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-content"
    }
}
