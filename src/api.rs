//! HTTP API for the chat backend

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::runtime::TurnOrchestrator;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
