//! HTTP API for the chat client
//!
//! Thin collaborator surface over the pipeline: reads its state, submits
//! turns and flips toggles.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::pipeline::ResponsePipeline;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResponsePipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ResponsePipeline>) -> Self {
        Self { pipeline }
    }
}
