//! Single-flight status of the pipeline
//!
//! `Idle --Submit--> Sending --Finish--> Idle`. A submission while
//! `Sending` is rejected, never queued.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;

use super::PipelineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Ready for user input
    #[default]
    Idle,
    /// A turn is in flight
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Submit,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is already being generated")]
    Busy,
    #[error("No turn is in flight")]
    NotSending,
}

/// Pure transition function
pub fn transition(
    status: PipelineStatus,
    event: StatusEvent,
) -> Result<PipelineStatus, TransitionError> {
    match (status, event) {
        (PipelineStatus::Idle, StatusEvent::Submit) => Ok(PipelineStatus::Sending),
        (PipelineStatus::Sending, StatusEvent::Submit) => Err(TransitionError::Busy),
        (PipelineStatus::Sending, StatusEvent::Finish) => Ok(PipelineStatus::Idle),
        (PipelineStatus::Idle, StatusEvent::Finish) => Err(TransitionError::NotSending),
    }
}

/// Shared status holder that announces every change
pub struct StatusCell {
    status: Mutex<PipelineStatus>,
    events: broadcast::Sender<PipelineEvent>,
}

impl StatusCell {
    pub fn new(events: broadcast::Sender<PipelineEvent>) -> Self {
        Self {
            status: Mutex::new(PipelineStatus::Idle),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> PipelineStatus {
        *self.lock()
    }

    fn apply(&self, event: StatusEvent) -> Result<PipelineStatus, TransitionError> {
        let mut status = self.lock();
        let next = transition(*status, event)?;
        *status = next;
        drop(status);
        let _ = self.events.send(PipelineEvent::StatusChanged(next));
        Ok(next)
    }

    /// Enter `Sending`. The returned guard restores `Idle` when dropped,
    /// whichever way the turn ends.
    pub fn try_begin(&self) -> Result<SendingGuard<'_>, TransitionError> {
        self.apply(StatusEvent::Submit)?;
        Ok(SendingGuard { cell: self })
    }
}

/// Held for the lifetime of one turn
pub struct SendingGuard<'a> {
    cell: &'a StatusCell,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cell.apply(StatusEvent::Finish) {
            tracing::error!(error = %e, "Status guard released outside a turn");
        }
    }
}
