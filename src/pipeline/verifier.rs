//! Search-grounded verification of factual statements
//!
//! The backend is asked to search before answering and to reply with
//! `CORRECT` when the statement holds. Anything else is surfaced to the
//! user as a correction.

use crate::llm::{
    run_with_policy, ContentGenerator, ContentRequest, ContentResponse, RetryPolicy,
    ToolDeclaration,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Replies containing any of these (case-insensitive) confirm the statement
pub const CONFIRMATION_PHRASES: &[&str] = &["the statement is correct", "this is accurate"];

/// Exact reply (case-insensitive) confirming the statement
pub const CONFIRMATION_TOKEN: &str = "correct";

pub const TOOL_ONLY_FALLBACK: &str =
    "Unable to complete fact-check due to technical limitations.";
pub const EMPTY_RESPONSE_FALLBACK: &str = "Unable to verify statement at this time.";
pub const SERVICE_UNAVAILABLE: &str = "Fact-check service is currently unavailable.";

const VERIFY_PROMPT: &str = "Use Google Search to verify the following statement before answering. \
If the statement is accurate, reply with exactly: CORRECT. \
If it is inaccurate, reply with a brief correction stating the accurate information.";

const VERIFY_SYSTEM_INSTRUCTION: &str = "You are a fact-checking assistant. \
Never ask clarifying questions. Always search and then answer directly, \
using only the reply format you were given.";

/// Result of verifying one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    NoCorrectionNeeded,
    Correction(String),
    /// Verification could not produce an answer; the text is still shown
    Unavailable(String),
}

/// Text recovered from a verification reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    Answer(String),
    /// The backend produced no usable answer
    Fallback(&'static str),
}

/// Pull the answer text out of a verification reply.
///
/// Direct text wins. A reply made only of function calls contributes
/// whatever inline text its candidates carry.
pub fn extract_verification_text(response: &ContentResponse) -> ExtractedText {
    if let Some(text) = response.text.as_deref() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return ExtractedText::Answer(trimmed.to_string());
        }
    }

    if response.has_function_calls() {
        let fragments = response.text_fragments();
        if fragments.is_empty() {
            return ExtractedText::Fallback(TOOL_ONLY_FALLBACK);
        }
        return ExtractedText::Answer(fragments.join(" "));
    }

    ExtractedText::Fallback(EMPTY_RESPONSE_FALLBACK)
}

/// Decide whether an answer confirms the statement
pub fn decide_outcome(answer: &str, phrases: &[String]) -> VerificationOutcome {
    let normalized = answer.trim().to_lowercase();
    let confirmed = normalized == CONFIRMATION_TOKEN
        || phrases
            .iter()
            .any(|phrase| normalized.contains(&phrase.to_lowercase()));

    if confirmed {
        VerificationOutcome::NoCorrectionNeeded
    } else {
        VerificationOutcome::Correction(answer.to_string())
    }
}

/// Verifies statements through a search-enabled backend call
pub struct GroundedVerifier {
    backend: Arc<dyn ContentGenerator>,
    policy: RetryPolicy,
    phrases: Vec<String>,
}

impl GroundedVerifier {
    pub fn new(backend: Arc<dyn ContentGenerator>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            phrases: CONFIRMATION_PHRASES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the confirmation phrase set
    pub fn with_phrases(mut self, phrases: Vec<String>) -> Self {
        self.phrases = phrases;
        self
    }

    fn request_for(statement: &str) -> ContentRequest {
        ContentRequest::new(format!("{VERIFY_PROMPT}\n\nStatement: {statement}"))
            .with_system_instruction(VERIFY_SYSTEM_INSTRUCTION)
            .with_tool(ToolDeclaration::google_search())
    }

    /// Verify `statement`. Never fails; backend errors become an
    /// `Unavailable` outcome.
    pub async fn verify(&self, statement: &str, cancel: &CancellationToken) -> VerificationOutcome {
        let request = Self::request_for(statement);

        let result = run_with_policy(&self.policy, cancel, || {
            self.backend.generate_content(&request)
        })
        .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Fact-check request failed");
                }
                return VerificationOutcome::Unavailable(SERVICE_UNAVAILABLE.to_string());
            }
        };

        let outcome = match extract_verification_text(&response) {
            ExtractedText::Answer(answer) => decide_outcome(&answer, &self.phrases),
            ExtractedText::Fallback(text) => {
                tracing::warn!(
                    function_calls = response.function_calls.len(),
                    "Fact-check reply carried no answer text"
                );
                VerificationOutcome::Unavailable(text.to_string())
            }
        };
        tracing::debug!(?outcome, "Statement verified");
        outcome
    }
}
