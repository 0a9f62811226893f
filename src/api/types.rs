//! API request and response types

use crate::capabilities::CapabilityKind;
use crate::leads::LeadSummary;
use crate::llm::Citation;
use crate::stage_machine::ConversationState;
use serde::{Deserialize, Serialize};

/// Response to session creation
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub state: ConversationState,
}

/// One chat turn: the client echoes the previous state back with the new
/// user message.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub state: ConversationState,
    pub message: String,
}

/// Result of one chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub state: ConversationState,
    pub reply: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_b64: Option<String>,
}

/// Request to run a capability demo. The kind can be named explicitly or
/// detected from the user's free-text request.
#[derive(Debug, Deserialize)]
pub struct CapabilityRequest {
    pub state: ConversationState,
    #[serde(default)]
    pub capability: Option<CapabilityKind>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a capability demo
#[derive(Debug, Serialize)]
pub struct CapabilityResponse {
    pub state: ConversationState,
    pub capability: CapabilityKind,
    pub output: String,
}

/// Response with the stored lead summaries
#[derive(Debug, Serialize)]
pub struct LeadsResponse {
    pub leads: Vec<LeadSummary>,
}

/// Response with a single lead summary
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: LeadSummary,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
