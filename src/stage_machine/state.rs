//! Conversation state types

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Per-session message cap. Part of the external contract.
pub const MAX_MESSAGES_PER_SESSION: usize = 15;

/// Email shape accepted by the `email_request` stage. Part of the external
/// contract; do not "improve" it.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Keywords that count as picking a capability in `capability_selection`.
pub const CAPABILITY_KEYWORDS: &[&str] = &[
    "generate", "analyze", "show", "try", "demo", "website", "image", "video", "document", "code",
];

/// Keywords that count as consent in `summary_offer`.
pub const AFFIRMATIVE_KEYWORDS: &[&str] =
    &["yes", "ok", "sure", "please", "generate", "summary", "do it"];

/// Keywords that count as declining in `summary_offer`.
pub const NEGATIVE_KEYWORDS: &[&str] = &["no", "not yet", "later", "skip"];

/// Sidebar-activity tags consumed by the realtime broadcast.
///
/// These exact string values are a stable vocabulary: downstream consumers
/// match on them, so they must never be renamed.
pub mod activity {
    pub const NONE: &str = "";
    pub const COMPANY_ANALYSIS_TRIGGERED: &str = "company_analysis_triggered";
    pub const COMPANY_ANALYSIS_COMPLETE: &str = "company_analysis_complete";
    pub const SUMMARY_GENERATION_STARTED: &str = "summary_generation_started";
    pub const SUMMARY_GENERATION_COMPLETE: &str = "summary_generation_complete";

    /// Tag a base activity as failed. Applied by the orchestration layer
    /// when a collaborator call errors out, never by the machine itself.
    pub fn error_tag(base: &str) -> String {
        if base.is_empty() {
            "turn_error".to_string()
        } else {
            format!("{base}_error")
        }
    }
}

/// Check a string against the contract email regex.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Stage of the lead-qualification conversation.
///
/// Closed set. `Unrecognized` is a runtime guard for stage tags coming out of
/// untyped storage (clients echo the previous state back as JSON): it is
/// never produced by the machine, and [`transition`](super::transition)
/// remaps it to `Greeting` with recovery guidance instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Initial stage: waiting for the lead to state their name.
    #[default]
    Greeting,
    /// Waiting for a syntactically valid email.
    EmailRequest,
    /// Transient: company-domain inference triggered, auto-advances.
    EmailCollected,
    /// Open-ended business-context gathering.
    InitialDiscovery,
    /// Transient: offers to demo a capability, auto-advances.
    CapabilityIntroduction,
    /// Waiting for the lead to pick or describe a capability.
    CapabilitySelection,
    /// Fallback when the lead stalls in `capability_selection`.
    CapabilitySuggestion,
    /// Entered out-of-band by the capability demo handlers.
    PostCapabilityFeedback,
    /// Discussing service fit.
    SolutionDiscussion,
    /// Asking consent to generate a summary.
    SummaryOffer,
    /// Terminal success: summary/brief being generated, booking offered.
    Finalizing,
    /// Terminal: per-session message cap hit.
    LimitReached,
    #[serde(other)]
    Unrecognized,
}

impl StageId {
    /// Stages the machine never leaves once entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, StageId::Finalizing | StageId::LimitReached)
    }

    /// Snake-case tag, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Greeting => "greeting",
            StageId::EmailRequest => "email_request",
            StageId::EmailCollected => "email_collected",
            StageId::InitialDiscovery => "initial_discovery",
            StageId::CapabilityIntroduction => "capability_introduction",
            StageId::CapabilitySelection => "capability_selection",
            StageId::CapabilitySuggestion => "capability_suggestion",
            StageId::PostCapabilityFeedback => "post_capability_feedback",
            StageId::SolutionDiscussion => "solution_discussion",
            StageId::SummaryOffer => "summary_offer",
            StageId::Finalizing => "finalizing",
            StageId::LimitReached => "limit_reached",
            StageId::Unrecognized => "unrecognized",
        }
    }
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

/// A single turn in the history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Company details derived once the email domain is known.
///
/// `name` and `domain` are inferred locally; `industry` and `analysis` are
/// filled by the external company-lookup side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl CompanyInfo {
    /// Infer company name + domain from an already-validated email address.
    pub fn from_email(email: &str) -> Option<Self> {
        let domain = email.split('@').nth(1)?;
        let name = domain.split('.').next().unwrap_or(domain);
        Some(Self {
            name: name.to_string(),
            domain: domain.to_string(),
            industry: None,
            analysis: None,
        })
    }
}

/// The sole persistent entity: one lead-qualification dialogue.
///
/// Created once at session start, transformed once per turn by
/// [`transition`](super::transition), and discarded when the browser session
/// ends. Only the finalized lead record is persisted server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub stage: StageId,
    #[serde(default)]
    pub messages_in_stage: u32,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_info: Option<CompanyInfo>,
    #[serde(default)]
    pub ai_guidance: String,
    #[serde(default)]
    pub sidebar_activity: String,
    #[serde(default)]
    pub capabilities_shown: BTreeSet<String>,
    #[serde(default)]
    pub is_limit_reached: bool,
    #[serde(default)]
    pub show_booking: bool,
}

impl ConversationState {
    /// The single constructor: fresh state at the greeting stage.
    ///
    /// Every call site goes through here; there are no inline defaults.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            stage: StageId::Greeting,
            messages_in_stage: 0,
            messages: Vec::new(),
            name: None,
            email: None,
            company_info: None,
            ai_guidance: super::guidance::greeting_entry(),
            sidebar_activity: activity::NONE.to_string(),
            capabilities_shown: BTreeSet::new(),
            is_limit_reached: false,
            show_booking: false,
        }
    }

    /// Append a user message to the history. Called by the runtime, not the
    /// machine: ids and timestamps are nondeterministic.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Append an AI reply to the history.
    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Ai,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Out-of-band entry used by the capability demo handlers: records the
    /// exercised capability and drops the conversation into
    /// `post_capability_feedback` with the in-stage counter forced to zero.
    pub fn enter_post_capability_feedback(&mut self, capability: &str) {
        self.capabilities_shown.insert(capability.to_string());
        self.stage = StageId::PostCapabilityFeedback;
        self.messages_in_stage = 0;
        self.ai_guidance = super::guidance::post_capability_feedback_entry(capability);
        self.sidebar_activity = format!("capability_demo_{capability}");
    }

    /// Number of user turns so far, used for the usage-limit guard.
    pub fn user_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_matches_contract() {
        assert!(is_valid_email("alex@acme.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@acme.com"));
        assert!(!is_valid_email("two@@acme.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn company_info_from_email() {
        let info = CompanyInfo::from_email("alex@acme.com").unwrap();
        assert_eq!(info.domain, "acme.com");
        assert_eq!(info.name, "acme");
        assert!(info.industry.is_none());
    }

    #[test]
    fn unknown_stage_tag_deserializes_to_unrecognized() {
        let stage: StageId = serde_json::from_str("\"bogus_unknown_value\"").unwrap();
        assert_eq!(stage, StageId::Unrecognized);

        let known: StageId = serde_json::from_str("\"summary_offer\"").unwrap();
        assert_eq!(known, StageId::SummaryOffer);
    }

    #[test]
    fn enter_post_capability_feedback_forces_counter() {
        let mut state = ConversationState::new("s-1");
        state.stage = StageId::CapabilitySelection;
        state.messages_in_stage = 3;

        state.enter_post_capability_feedback("image");

        assert_eq!(state.stage, StageId::PostCapabilityFeedback);
        assert_eq!(state.messages_in_stage, 0);
        assert!(state.capabilities_shown.contains("image"));
        assert_eq!(state.sidebar_activity, "capability_demo_image");
    }

    #[test]
    fn error_tag_shapes() {
        assert_eq!(
            activity::error_tag(activity::SUMMARY_GENERATION_STARTED),
            "summary_generation_started_error"
        );
        assert_eq!(activity::error_tag(""), "turn_error");
    }
}
