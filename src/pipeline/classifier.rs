//! FACT / OPINION classification of generated statements

use crate::llm::{run_with_policy, ContentGenerator, ContentRequest, RetryPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CLASSIFY_PROMPT: &str = "Classify the following statement as either FACT or OPINION. \
A FACT is an objective claim that can be checked against external sources. \
An OPINION is subjective, a preference, or a judgement. \
Respond with exactly one word: FACT or OPINION.";

const CLASSIFY_MAX_TOKENS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Fact,
    Opinion,
}

/// Interpret a classifier reply. Anything not mentioning FACT is an opinion.
pub fn parse_classification(reply: &str) -> Classification {
    if reply.trim().to_uppercase().contains("FACT") {
        Classification::Fact
    } else {
        Classification::Opinion
    }
}

/// Labels statements using the content backend
pub struct StatementClassifier {
    backend: Arc<dyn ContentGenerator>,
    policy: RetryPolicy,
}

impl StatementClassifier {
    pub fn new(backend: Arc<dyn ContentGenerator>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Classify `statement`. Backend failures fall back to `Opinion`,
    /// which skips verification.
    pub async fn classify(&self, statement: &str, cancel: &CancellationToken) -> Classification {
        let request = ContentRequest::new(format!("{CLASSIFY_PROMPT}\n\nStatement: {statement}"))
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let result = run_with_policy(&self.policy, cancel, || {
            self.backend.generate_content(&request)
        })
        .await;

        match result {
            Ok(response) => {
                let reply = response.text.unwrap_or_default();
                let classification = parse_classification(&reply);
                tracing::debug!(reply = %reply.trim(), ?classification, "Statement classified");
                classification
            }
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Classification failed, treating as opinion");
                }
                Classification::Opinion
            }
        }
    }
}
