//! Pure stage transition function
//!
//! One call per inbound chat turn. Given the same state, message, and message
//! count this always produces the same next state, with no I/O: side effects
//! are triggered by the caller reading `sidebar_activity` / stage edges off
//! the returned state.

use super::guidance;
use super::state::{
    activity, CompanyInfo, ConversationState, StageId, AFFIRMATIVE_KEYWORDS, CAPABILITY_KEYWORDS,
    MAX_MESSAGES_PER_SESSION, NEGATIVE_KEYWORDS,
};

/// What one stage handler decided for this turn.
///
/// `next == current` means "stay and re-prompt"; the counter bookkeeping is
/// applied centrally in [`transition`] so no handler can get it wrong.
struct StageOutcome {
    next: StageId,
    guidance: String,
    activity: String,
    name: Option<String>,
    email: Option<String>,
    company_info: Option<CompanyInfo>,
}

impl StageOutcome {
    fn advance(next: StageId, guidance: String) -> Self {
        Self {
            next,
            guidance,
            activity: activity::NONE.to_string(),
            name: None,
            email: None,
            company_info: None,
        }
    }

    fn stay(current: StageId, guidance: String) -> Self {
        Self::advance(current, guidance)
    }

    fn with_activity(mut self, tag: &str) -> Self {
        self.activity = tag.to_string();
        self
    }
}

/// Advance the conversation by one turn.
///
/// Never panics and never fails: malformed input counts as "no match" for
/// every keyword/regex rule, and an unrecognized stage resets to `greeting`.
pub fn transition(
    state: &ConversationState,
    user_message: &str,
    message_count: usize,
) -> ConversationState {
    // The usage-limit guard runs before the stage table on every turn and
    // bypasses it entirely when it fires.
    if message_count >= MAX_MESSAGES_PER_SESSION && state.stage != StageId::LimitReached {
        let mut next = state.clone();
        next.stage = StageId::LimitReached;
        next.messages_in_stage = 0;
        next.is_limit_reached = true;
        next.show_booking = true;
        next.ai_guidance = guidance::limit_reached();
        next.sidebar_activity = activity::NONE.to_string();
        return next;
    }

    let trimmed = user_message.trim();

    let outcome = match state.stage {
        StageId::Greeting => greeting(trimmed),
        StageId::EmailRequest => email_request(state, trimmed),
        StageId::EmailCollected => email_collected(state),
        StageId::InitialDiscovery => initial_discovery(state),
        StageId::CapabilityIntroduction => {
            StageOutcome::advance(StageId::CapabilitySelection, guidance::capability_selection_entry())
        }
        StageId::CapabilitySelection => capability_selection(state, trimmed),
        StageId::CapabilitySuggestion => {
            // Bounce-back loop by design: suggestion always returns to selection.
            StageOutcome::advance(StageId::CapabilitySelection, guidance::capability_selection_entry())
        }
        StageId::PostCapabilityFeedback => {
            // The shipped gate here is `messages_in_stage >= 0`, which always
            // holds: the transition fires on the very next turn rather than
            // waiting for actual feedback. Preserved verbatim.
            StageOutcome::advance(StageId::SolutionDiscussion, guidance::solution_discussion_entry())
        }
        StageId::SolutionDiscussion => solution_discussion(state),
        StageId::SummaryOffer => summary_offer(trimmed),
        StageId::Finalizing => {
            StageOutcome::stay(StageId::Finalizing, guidance::finalizing_hold())
        }
        StageId::LimitReached => {
            StageOutcome::stay(StageId::LimitReached, guidance::limit_reached())
        }
        StageId::Unrecognized => {
            StageOutcome::advance(StageId::Greeting, guidance::recovery())
        }
    };

    apply(state, outcome)
}

/// Apply a handler's outcome, enforcing the counter and monotonicity
/// invariants in one place.
fn apply(state: &ConversationState, outcome: StageOutcome) -> ConversationState {
    let mut next = state.clone();

    if outcome.next == state.stage {
        next.messages_in_stage = state.messages_in_stage + 1;
    } else {
        next.stage = outcome.next;
        next.messages_in_stage = 0;
    }

    // Finalizing offers the booking link; the flag is sticky from here on.
    if next.stage == StageId::Finalizing {
        next.show_booking = true;
    }

    next.ai_guidance = outcome.guidance;
    next.sidebar_activity = outcome.activity;

    if let Some(name) = outcome.name {
        next.name = Some(name);
    }
    // Email is write-once: a captured valid address is never replaced.
    if next.email.is_none() {
        next.email = outcome.email;
    }
    if next.company_info.is_none() {
        next.company_info = outcome.company_info;
    }

    next
}

// ============================================================
// Per-stage handlers
// ============================================================

/// Heuristic "this looks like a first name, not a sentence or an email":
/// more than one character, no `@`, fewer than five words.
fn greeting(trimmed: &str) -> StageOutcome {
    let looks_like_name = trimmed.chars().count() > 1
        && !trimmed.contains('@')
        && trimmed.split_whitespace().count() < 5;

    if looks_like_name {
        let mut outcome =
            StageOutcome::advance(StageId::EmailRequest, guidance::email_request_entry(trimmed));
        outcome.name = Some(trimmed.to_string());
        outcome
    } else {
        StageOutcome::stay(StageId::Greeting, guidance::greeting_hold())
    }
}

fn email_request(state: &ConversationState, trimmed: &str) -> StageOutcome {
    if !super::state::is_valid_email(trimmed) {
        return StageOutcome::stay(StageId::EmailRequest, guidance::email_request_hold());
    }

    let company = state
        .company_info
        .clone()
        .or_else(|| CompanyInfo::from_email(trimmed));
    let company_name = company.as_ref().map(|c| c.name.clone());

    let mut outcome = StageOutcome::advance(
        StageId::EmailCollected,
        guidance::email_collected_entry(company_name.as_deref()),
    )
    .with_activity(activity::COMPANY_ANALYSIS_TRIGGERED);
    outcome.email = Some(trimmed.to_string());
    outcome.company_info = company;
    outcome
}

/// System-advanced: no user input required.
fn email_collected(_state: &ConversationState) -> StageOutcome {
    StageOutcome::advance(StageId::InitialDiscovery, guidance::initial_discovery_entry())
        .with_activity(activity::COMPANY_ANALYSIS_COMPLETE)
}

fn initial_discovery(state: &ConversationState) -> StageOutcome {
    if state.messages_in_stage >= 1 {
        StageOutcome::advance(
            StageId::CapabilityIntroduction,
            guidance::capability_introduction_entry(),
        )
    } else {
        StageOutcome::stay(StageId::InitialDiscovery, guidance::initial_discovery_hold())
    }
}

fn capability_selection(state: &ConversationState, trimmed: &str) -> StageOutcome {
    let lower = trimmed.to_lowercase();
    let picked = CAPABILITY_KEYWORDS.iter().any(|kw| lower.contains(kw));

    if state.messages_in_stage >= 1 && !picked {
        StageOutcome::advance(
            StageId::CapabilitySuggestion,
            guidance::capability_suggestion_entry(),
        )
    } else {
        StageOutcome::stay(
            StageId::CapabilitySelection,
            guidance::capability_selection_hold(),
        )
    }
}

fn solution_discussion(state: &ConversationState) -> StageOutcome {
    if state.messages_in_stage >= 1 {
        StageOutcome::advance(StageId::SummaryOffer, guidance::summary_offer_entry())
    } else {
        StageOutcome::stay(
            StageId::SolutionDiscussion,
            guidance::solution_discussion_hold(),
        )
    }
}

fn summary_offer(trimmed: &str) -> StageOutcome {
    let lower = trimmed.to_lowercase();

    if AFFIRMATIVE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        StageOutcome::advance(StageId::Finalizing, guidance::finalizing_entry())
            .with_activity(activity::SUMMARY_GENERATION_STARTED)
    } else if NEGATIVE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        StageOutcome::advance(
            StageId::SolutionDiscussion,
            guidance::solution_discussion_entry(),
        )
    } else {
        StageOutcome::stay(StageId::SummaryOffer, guidance::summary_offer_hold())
    }
}
