//! Text-generation provider abstraction
//!
//! The conversation layer talks to one narrow interface: guidance + history +
//! user message in, reply text plus optional grounding citations out.

mod error;
mod gemini;
mod types;

pub use error::{TextGenError, TextGenErrorKind};
pub use gemini::{GeminiModel, GeminiService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for text-generation providers
#[async_trait]
pub trait TextGenService: Send + Sync {
    /// Generate a reply for one conversation turn
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, TextGenError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for text-generation services
pub struct LoggingService {
    inner: Arc<dyn TextGenService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn TextGenService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl TextGenService for LoggingService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, TextGenError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    reply_chars = reply.text.len(),
                    citations = reply.citations.len(),
                    "text generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "text generation failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
