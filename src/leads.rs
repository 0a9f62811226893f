//! Lead-summary construction and scoring
//!
//! Pure helpers over a finished (or capped) conversation: a 0-100 score, a
//! deterministic digest used when the LLM digest is unavailable, and a
//! plain-text follow-up email draft. The record itself is persisted by the
//! lead store.

use crate::stage_machine::{ConversationState, Sender, StageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted outcome of one qualified conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: String,
    pub session_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub company_domain: Option<String>,
    pub industry: Option<String>,
    pub capabilities_shown: Vec<String>,
    pub score: u8,
    pub digest: String,
    pub follow_up_email: String,
    pub created_at: DateTime<Utc>,
}

impl LeadSummary {
    /// Build a summary from the final conversation state. `digest` is the
    /// LLM-written recap, or `None` to use the deterministic fallback.
    pub fn from_conversation(state: &ConversationState, digest: Option<String>) -> Self {
        let score = score_lead(state);
        let digest = digest.unwrap_or_else(|| fallback_digest(state));
        let follow_up_email = follow_up_email(state, score);

        let (company_name, company_domain, industry) = match &state.company_info {
            Some(info) => (
                Some(info.name.clone()),
                Some(info.domain.clone()),
                info.industry.clone(),
            ),
            None => (None, None, None),
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: state.session_id.clone(),
            name: state.name.clone(),
            email: state.email.clone(),
            company_name,
            company_domain,
            industry,
            capabilities_shown: state.capabilities_shown.iter().cloned().collect(),
            score,
            digest,
            follow_up_email,
            created_at: Utc::now(),
        }
    }
}

/// 0-100 qualification score.
///
/// Weights: identity 35 (name 15, email 20), company 25 (known 15, industry
/// 10), engagement up to 20 (2 per user turn), capabilities up to 15 (5
/// each), summary consent 5.
pub fn score_lead(state: &ConversationState) -> u8 {
    let mut score = 0u32;

    if state.name.is_some() {
        score += 15;
    }
    if state.email.is_some() {
        score += 20;
    }
    if let Some(info) = &state.company_info {
        score += 15;
        if info.industry.is_some() {
            score += 10;
        }
    }

    let user_turns = state
        .messages
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count() as u32;
    score += (user_turns * 2).min(20);

    score += (state.capabilities_shown.len() as u32 * 5).min(15);

    // Reaching finalizing means the lead said yes to the summary.
    if state.stage == StageId::Finalizing {
        score += 5;
    }

    score.min(100) as u8
}

/// Deterministic conversation digest, used when the LLM digest fails.
pub fn fallback_digest(state: &ConversationState) -> String {
    let name = state.name.as_deref().unwrap_or("an unidentified visitor");
    let company = state
        .company_info
        .as_ref()
        .map_or_else(|| "an unknown company".to_string(), |c| c.name.clone());
    let turns = state
        .messages
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();

    let mut digest = format!(
        "Conversation with {name} from {company}: {turns} user message(s), \
         ended in the {} stage.",
        state.stage.as_str()
    );

    if state.capabilities_shown.is_empty() {
        digest.push_str(" No capability demos were run.");
    } else {
        let caps: Vec<&str> = state
            .capabilities_shown
            .iter()
            .map(String::as_str)
            .collect();
        digest.push_str(&format!(" Capabilities demoed: {}.", caps.join(", ")));
    }

    digest
}

/// Score band used in the follow-up email copy.
fn score_band(score: u8) -> &'static str {
    match score {
        0..=39 => "early interest",
        40..=69 => "qualified interest",
        _ => "strong fit",
    }
}

/// Plain-text follow-up email draft.
pub fn follow_up_email(state: &ConversationState, score: u8) -> String {
    let name = state.name.as_deref().unwrap_or("there");
    let company_line = state
        .company_info
        .as_ref()
        .map(|c| format!(" at {}", c.name))
        .unwrap_or_default();

    let caps_line = if state.capabilities_shown.is_empty() {
        "We touched on how AI could fit into your workflow.".to_string()
    } else {
        let caps: Vec<&str> = state
            .capabilities_shown
            .iter()
            .map(String::as_str)
            .collect();
        format!(
            "You tried out our {} capabilit{} during the session.",
            caps.join(", "),
            if caps.len() == 1 { "y" } else { "ies" }
        )
    };

    format!(
        "Subject: Following up on your AI consultation\n\
         \n\
         Hi {name},\n\
         \n\
         Thanks for exploring what AI can do for your team{company_line}. \
         {caps_line}\n\
         \n\
         Based on our conversation ({band}), the next step is a short call to \
         map these capabilities onto your roadmap. You can book a slot at your \
         convenience from the link in this thread.\n\
         \n\
         Best,\n\
         F.B/c",
        band = score_band(score),
    )
}
