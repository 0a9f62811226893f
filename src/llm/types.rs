//! Common types for text-generation requests

use crate::stage_machine::{Message, Sender};
use serde::{Deserialize, Serialize};

/// One generation request: the stage guidance plus the turn history.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Stage-specific instruction text from the state machine. Never shown
    /// to the end user verbatim.
    pub system_guidance: String,
    pub history: Vec<Turn>,
    pub user_message: String,
    /// Ask the provider to ground the reply with web search.
    pub grounding: bool,
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(
        system_guidance: impl Into<String>,
        history: Vec<Turn>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            system_guidance: system_guidance.into(),
            history,
            user_message: user_message.into(),
            grounding: false,
            max_output_tokens: None,
        }
    }

    pub fn with_grounding(mut self) -> Self {
        self.grounding = true;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }

    /// Map a stored history message onto a provider turn.
    pub fn from_message(message: &Message) -> Self {
        match message.sender {
            Sender::User => Self::user(message.text.clone()),
            Sender::Ai => Self::model(message.text.clone()),
        }
    }
}

/// Role of a turn, in provider terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// Generated reply with optional grounding citations.
#[derive(Debug, Clone, Default)]
pub struct GeneratedReply {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Source attribution returned when the provider used web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}
