//! Property-based tests for the stage machine
//!
//! These verify the contract invariants hold across all inputs, not just the
//! scripted happy path.

use super::state::*;
use super::transition::transition;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn arb_stage() -> impl Strategy<Value = StageId> {
    prop_oneof![
        Just(StageId::Greeting),
        Just(StageId::EmailRequest),
        Just(StageId::EmailCollected),
        Just(StageId::InitialDiscovery),
        Just(StageId::CapabilityIntroduction),
        Just(StageId::CapabilitySelection),
        Just(StageId::CapabilitySuggestion),
        Just(StageId::PostCapabilityFeedback),
        Just(StageId::SolutionDiscussion),
        Just(StageId::SummaryOffer),
        Just(StageId::Finalizing),
        Just(StageId::LimitReached),
        Just(StageId::Unrecognized),
    ]
}

fn arb_terminal_stage() -> impl Strategy<Value = StageId> {
    prop_oneof![Just(StageId::Finalizing), Just(StageId::LimitReached)]
}

fn arb_message() -> impl Strategy<Value = String> {
    prop_oneof![
        // Plain words and sentences
        "[a-zA-Z ]{0,40}",
        // Things shaped like emails
        "[a-z]{1,8}@[a-z]{1,8}\\.[a-z]{2,3}",
        // Keyword-laden inputs
        Just("yes please generate it".to_string()),
        Just("no, not yet".to_string()),
        Just("show me the image demo".to_string()),
        // Degenerate inputs
        Just(String::new()),
        Just("   ".to_string()),
        Just("@@@".to_string()),
    ]
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    (arb_stage(), 0u32..4, proptest::option::of("[a-z]{2,8}")).prop_map(
        |(stage, messages_in_stage, name)| {
            let mut state = ConversationState::new("prop-session");
            state.stage = stage;
            state.messages_in_stage = messages_in_stage;
            state.name = name;
            if stage == StageId::LimitReached {
                state.is_limit_reached = true;
                state.show_booking = true;
            }
            state
        },
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Either the stage changed and the counter reset to zero, or the stage
    /// held and the counter incremented by exactly one.
    #[test]
    fn counter_invariant(state in arb_state(), msg in arb_message(), count in 0usize..15) {
        let next = transition(&state, &msg, count);

        if next.stage == state.stage {
            prop_assert_eq!(next.messages_in_stage, state.messages_in_stage + 1);
        } else {
            prop_assert_eq!(next.messages_in_stage, 0);
        }
    }

    /// Terminal stages never transition out, for any input.
    #[test]
    fn terminal_stages_are_idempotent(
        stage in arb_terminal_stage(),
        msg in arb_message(),
        count in 0usize..40,
    ) {
        let mut state = ConversationState::new("prop-session");
        state.stage = stage;
        if stage == StageId::LimitReached {
            state.is_limit_reached = true;
        }

        let next = transition(&state, &msg, count);
        prop_assert_eq!(next.stage, stage);
    }

    /// The usage-limit guard fires for any state and any input once the
    /// per-session count reaches the cap.
    #[test]
    fn limit_guard_takes_precedence(state in arb_state(), msg in arb_message(), count in 15usize..60) {
        let next = transition(&state, &msg, count);

        prop_assert_eq!(next.stage, StageId::LimitReached);
        prop_assert!(next.is_limit_reached);
        prop_assert!(next.show_booking);
    }

    /// A captured email survives every subsequent transition unchanged.
    #[test]
    fn email_capture_is_monotonic(state in arb_state(), msg in arb_message(), count in 0usize..30) {
        let mut state = state;
        state.email = Some("alex@acme.com".to_string());

        let next = transition(&state, &msg, count);
        prop_assert_eq!(next.email.as_deref(), Some("alex@acme.com"));
    }

    /// Sticky flags never reset once set.
    #[test]
    fn limit_flags_are_sticky(state in arb_state(), msg in arb_message(), count in 0usize..30) {
        let mut state = state;
        state.is_limit_reached = true;
        state.show_booking = true;

        let next = transition(&state, &msg, count);
        prop_assert!(next.is_limit_reached);
        prop_assert!(next.show_booking);
    }

    /// The machine never emits the storage-guard variant: whatever comes in,
    /// the output stage is a real member of the closed set.
    #[test]
    fn output_stage_is_always_recognized(state in arb_state(), msg in arb_message(), count in 0usize..30) {
        let next = transition(&state, &msg, count);
        prop_assert_ne!(next.stage, StageId::Unrecognized);
    }

    /// An unrecognized stage tag (e.g. from corrupted client state) resets to
    /// greeting instead of erroring.
    #[test]
    fn fallback_safety(msg in arb_message(), count in 0usize..15) {
        let state: ConversationState = serde_json::from_value(serde_json::json!({
            "session_id": "prop-session",
            "stage": "bogus_unknown_value",
        })).unwrap();

        let next = transition(&state, &msg, count);
        prop_assert_eq!(next.stage, StageId::Greeting);
    }

    /// Capability history only grows; transitions never drop entries.
    #[test]
    fn capabilities_shown_never_shrinks(state in arb_state(), msg in arb_message(), count in 0usize..30) {
        let mut state = state;
        state.capabilities_shown.insert("image".to_string());
        state.capabilities_shown.insert("code".to_string());

        let next = transition(&state, &msg, count);
        prop_assert!(next.capabilities_shown.is_superset(&state.capabilities_shown));
    }

    /// Guidance is recomputed every turn and is never left empty.
    #[test]
    fn guidance_is_always_populated(state in arb_state(), msg in arb_message(), count in 0usize..30) {
        let next = transition(&state, &msg, count);
        prop_assert!(!next.ai_guidance.is_empty());
    }
}
