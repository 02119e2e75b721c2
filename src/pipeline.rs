//! Response orchestration pipeline
//!
//! One user turn: build the context, generate a reply, classify it, verify
//! factual replies, then commit the reply and its correction. Only one turn
//! may be in flight; the status returns to idle on every exit path.

mod classifier;
mod context;
mod status;
mod toggles;
mod verifier;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use classifier::{Classification, StatementClassifier};
pub use context::build_prompt;
pub use status::PipelineStatus;
pub use toggles::{ToggleUpdate, Toggles};
pub use verifier::{GroundedVerifier, VerificationOutcome, CONFIRMATION_PHRASES};

use crate::config::PipelineSettings;
use crate::conversation::{Conversation, Correction, Message};
use crate::llm::{run_with_policy, ContentGenerator, LlmError, RetryPolicy, TextGenerator};
use status::StatusCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use toggles::ToggleState;

pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const OPINION_SKIP_NOTICE: &str =
    "This statement appears to be an opinion, skipping fact-check.";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Changes announced to subscribers
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    MessageAppended(Message),
    StatusChanged(PipelineStatus),
    TogglesChanged(Toggles),
}

/// Why a submission was dropped without effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A reply is already being generated")]
    Busy,
}

/// How a call to [`ResponsePipeline::submit`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The bot reply was appended
    Replied(Message),
    /// Generation failed; the apology message was appended
    Failed(Message),
    /// The turn was cancelled before a reply was committed
    Cancelled,
    /// Nothing happened
    Rejected(RejectReason),
}

#[derive(Debug, Error)]
enum TurnError {
    #[error("generation failed: {0}")]
    Generation(LlmError),
    #[error("turn cancelled")]
    Cancelled,
}

impl From<LlmError> for TurnError {
    fn from(e: LlmError) -> Self {
        if e.is_cancelled() {
            TurnError::Cancelled
        } else {
            TurnError::Generation(e)
        }
    }
}

/// Trim and make sure the text reads as a question.
///
/// Returns `None` for blank input.
pub fn normalize_question(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.ends_with('?') {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}?"))
    }
}

/// Orchestrates a user turn and owns the conversation
pub struct ResponsePipeline {
    generator: Arc<dyn TextGenerator>,
    classifier: StatementClassifier,
    verifier: GroundedVerifier,
    generation_policy: RetryPolicy,
    conversation: RwLock<Conversation>,
    toggles: ToggleState,
    status: StatusCell,
    /// Cancellation handle of the turn in flight
    current_turn: Mutex<Option<CancellationToken>>,
    events: broadcast::Sender<PipelineEvent>,
}

/// Live turn; clears the cancellation handle, then releases the status
struct Turn<'a> {
    pipeline: &'a ResponsePipeline,
    cancel: CancellationToken,
    _sending: status::SendingGuard<'a>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.pipeline.lock_turn().take();
    }
}

impl ResponsePipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        content: Arc<dyn ContentGenerator>,
        settings: &PipelineSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            generator,
            classifier: StatementClassifier::new(content.clone(), settings.content_policy.clone()),
            verifier: GroundedVerifier::new(content, settings.content_policy.clone())
                .with_phrases(settings.confirmation_phrases.clone()),
            generation_policy: settings.generation_policy.clone(),
            conversation: RwLock::new(Conversation::new()),
            toggles: ToggleState::new(settings.toggles),
            status: StatusCell::new(events.clone()),
            current_turn: Mutex::new(None),
            events,
        }
    }

    fn lock_turn(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current_turn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status.get()
    }

    pub fn toggles(&self) -> Toggles {
        self.toggles.snapshot()
    }

    pub fn update_toggles(&self, update: ToggleUpdate) -> Toggles {
        let toggles = self.toggles.apply(update);
        tracing::info!(
            context_enabled = toggles.context_enabled,
            fact_check_enabled = toggles.fact_check_enabled,
            "Toggles updated"
        );
        self.emit(PipelineEvent::TogglesChanged(toggles));
        toggles
    }

    /// Snapshot of the conversation in display order
    pub fn messages(&self) -> Vec<Message> {
        self.conversation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages()
            .to_vec()
    }

    /// Cancel the turn in flight. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        match self.lock_turn().as_ref() {
            Some(token) => {
                tracing::info!("Cancelling turn in flight");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin_turn(&self) -> Result<Turn<'_>, RejectReason> {
        // The handle slot stays locked while entering `Sending`, so a
        // concurrent `cancel` always finds the token of a turn in flight
        let mut slot = self.lock_turn();
        let sending = self.status.try_begin().map_err(|_| RejectReason::Busy)?;
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        drop(slot);
        Ok(Turn {
            pipeline: self,
            cancel,
            _sending: sending,
        })
    }

    fn append(&self, push: impl FnOnce(&mut Conversation) -> Message) -> Message {
        let message = {
            let mut conversation = self
                .conversation
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            push(&mut conversation)
        };
        self.emit(PipelineEvent::MessageAppended(message.clone()));
        message
    }

    /// Run one user turn to completion
    pub async fn submit(&self, user_text: &str) -> SubmitOutcome {
        let Some(question) = normalize_question(user_text) else {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        };

        let turn = match self.begin_turn() {
            Ok(turn) => turn,
            Err(reason) => {
                tracing::debug!(%reason, "Dropping submission");
                return SubmitOutcome::Rejected(reason);
            }
        };

        let toggles = self.toggles.snapshot();
        let mut prompt = String::new();
        self.append(|conversation| {
            prompt = build_prompt(conversation, &question, toggles.context_enabled);
            conversation.push_user(question.as_str()).clone()
        });
        tracing::info!(
            context_enabled = toggles.context_enabled,
            fact_check_enabled = toggles.fact_check_enabled,
            "Turn started"
        );

        let outcome = match self.run_turn(&prompt, toggles, &turn.cancel).await {
            Ok((reply, correction)) => {
                tracing::info!(correction = correction.kind(), "Turn completed");
                SubmitOutcome::Replied(
                    self.append(|conversation| conversation.push_bot(reply, correction).clone()),
                )
            }
            Err(TurnError::Generation(e)) => {
                tracing::error!(error = %e, status = ?e.status, "Generation failed");
                SubmitOutcome::Failed(
                    self.append(|conversation| conversation.push_error(APOLOGY_TEXT).clone()),
                )
            }
            Err(TurnError::Cancelled) => {
                tracing::info!("Turn cancelled");
                SubmitOutcome::Cancelled
            }
        };

        drop(turn);
        outcome
    }

    async fn run_turn(
        &self,
        prompt: &str,
        toggles: Toggles,
        cancel: &CancellationToken,
    ) -> Result<(String, Correction), TurnError> {
        let reply = run_with_policy(&self.generation_policy, cancel, || {
            self.generator.generate(prompt)
        })
        .await?;

        let correction = if toggles.fact_check_enabled {
            self.fact_check(&reply, cancel).await
        } else {
            Correction::None
        };

        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }
        Ok((reply, correction))
    }

    async fn fact_check(&self, statement: &str, cancel: &CancellationToken) -> Correction {
        match self.classifier.classify(statement, cancel).await {
            Classification::Opinion => Correction::Skipped(OPINION_SKIP_NOTICE.to_string()),
            Classification::Fact => match self.verifier.verify(statement, cancel).await {
                VerificationOutcome::NoCorrectionNeeded => Correction::Confirmed,
                VerificationOutcome::Correction(text) => Correction::Corrected(text),
                VerificationOutcome::Unavailable(text) => Correction::Unavailable(text),
            },
        }
    }
}
