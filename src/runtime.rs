//! Per-turn orchestration
//!
//! The stage machine is pure; everything effectful happens here. One turn:
//! run the transition, broadcast the activity tag, perform whatever side
//! effect the tag calls for (company lookup, lead finalization), generate the
//! reply, optionally synthesize audio, and append both messages to the
//! history.
//!
//! Failure policy: a collaborator error never corrupts the conversation. The
//! pre-transition state is preserved, the activity tag gets an `_error`
//! suffix, and the user sees a generic retry message.

use crate::capabilities::{self, CapabilityKind, DemoResult};
use crate::company;
use crate::db::LeadStore;
use crate::leads::LeadSummary;
use crate::llm::{Citation, GenerationRequest, TextGenService, Turn};
use crate::realtime::{ActivityEvent, BroadcastHub};
use crate::stage_machine::{activity, transition, ConversationState, StageId};
use crate::voice::VoiceSynthesis;
use std::sync::Arc;

const FAILURE_REPLY: &str =
    "Sorry, something went wrong on my end. Could you say that again?";
const DIGEST_MAX_TOKENS: u32 = 512;

/// Result of one completed turn.
pub struct TurnOutcome {
    pub state: ConversationState,
    pub reply: String,
    pub citations: Vec<Citation>,
    pub audio: Option<Vec<u8>>,
}

/// Drives the conversation: pure transition in the middle, side effects
/// around it.
pub struct TurnOrchestrator {
    llm: Arc<dyn TextGenService>,
    voice: Option<Arc<dyn VoiceSynthesis>>,
    hub: Arc<BroadcastHub>,
    store: LeadStore,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn TextGenService>,
        voice: Option<Arc<dyn VoiceSynthesis>>,
        hub: Arc<BroadcastHub>,
        store: LeadStore,
    ) -> Self {
        Self {
            llm,
            voice,
            hub,
            store,
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn store(&self) -> &LeadStore {
        &self.store
    }

    /// Run one full conversation turn.
    pub async fn run_turn(
        &self,
        state: &ConversationState,
        user_message: &str,
    ) -> TurnOutcome {
        let session_id = state.session_id.clone();
        // The incoming message counts toward the cap.
        let message_count = state.user_message_count() + 1;

        let history: Vec<Turn> = state.messages.iter().map(Turn::from_message).collect();

        let mut next = transition(state, user_message, message_count);
        next.push_user(user_message);

        tracing::info!(
            session_id = %session_id,
            from_stage = state.stage.as_str(),
            to_stage = next.stage.as_str(),
            activity = %next.sidebar_activity,
            message_count,
            "turn transition"
        );

        self.hub
            .publish_activity(&session_id, &next.sidebar_activity);

        if next.sidebar_activity == activity::COMPANY_ANALYSIS_TRIGGERED {
            self.lookup_company(&mut next).await;
        }

        // Grounding only makes sense while we are still learning about the
        // company; later stages are scripted conversation.
        let grounded = matches!(
            next.stage,
            StageId::EmailCollected | StageId::InitialDiscovery
        );
        let mut request =
            GenerationRequest::new(next.ai_guidance.clone(), history, user_message);
        if grounded {
            request = request.with_grounding();
        }

        let reply = match self.llm.generate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    stage = next.stage.as_str(),
                    error = %e,
                    retryable = e.kind.is_retryable(),
                    "reply generation failed"
                );
                return self.failed_turn(state, user_message, &next.sidebar_activity);
            }
        };

        if next.sidebar_activity == activity::SUMMARY_GENERATION_STARTED {
            if self.finalize_lead(&next).await.is_err() {
                return self.failed_turn(state, user_message, &next.sidebar_activity);
            }
            self.hub
                .publish_activity(&session_id, activity::SUMMARY_GENERATION_COMPLETE);
        }

        let audio = self.synthesize(&session_id, &reply.text).await;

        next.push_ai(reply.text.clone());
        self.hub.publish(
            &session_id,
            ActivityEvent::Reply {
                stage: next.stage,
                text: reply.text.clone(),
            },
        );
        if next.is_limit_reached && !state.is_limit_reached {
            self.hub.publish(
                &session_id,
                ActivityEvent::Limit {
                    show_booking: next.show_booking,
                },
            );
        }

        TurnOutcome {
            state: next,
            reply: reply.text,
            citations: reply.citations,
            audio,
        }
    }

    /// Run a capability demo stub, out of band from the transition function.
    pub async fn run_capability(
        &self,
        state: &ConversationState,
        kind: CapabilityKind,
    ) -> (ConversationState, DemoResult) {
        let mut next = state.clone();
        let result = capabilities::run_demo(&mut next, kind);

        self.hub
            .publish_activity(&state.session_id, &next.sidebar_activity);
        next.push_ai(result.output.clone());
        self.hub.publish(
            &state.session_id,
            ActivityEvent::Reply {
                stage: next.stage,
                text: result.output.clone(),
            },
        );

        (next, result)
    }

    /// Collaborator failure: keep the old state (plus the user's message so
    /// nothing they typed is lost), mark the activity as failed, reply
    /// generically.
    fn failed_turn(
        &self,
        state: &ConversationState,
        user_message: &str,
        attempted_activity: &str,
    ) -> TurnOutcome {
        let tag = activity::error_tag(attempted_activity);
        self.hub.publish_activity(&state.session_id, &tag);

        let mut preserved = state.clone();
        preserved.push_user(user_message);
        preserved.sidebar_activity = tag;
        preserved.push_ai(FAILURE_REPLY);

        TurnOutcome {
            state: preserved,
            reply: FAILURE_REPLY.to_string(),
            citations: Vec::new(),
            audio: None,
        }
    }

    /// Fill `industry`/`analysis` on the freshly inferred company info.
    /// Soft-fails: the conversation proceeds either way.
    async fn lookup_company(&self, state: &mut ConversationState) {
        let Some(info) = state.company_info.clone() else {
            return;
        };
        if let Some(analysis) = company::analyze_company(&self.llm, &info).await {
            if let Some(company_info) = &mut state.company_info {
                company::merge_analysis(company_info, analysis);
            }
            tracing::info!(
                session_id = %state.session_id,
                domain = %info.domain,
                "company analysis merged"
            );
        }
    }

    /// Build and persist the lead summary. An LLM digest failure falls back
    /// to the deterministic digest; only a store failure is an error.
    async fn finalize_lead(&self, state: &ConversationState) -> Result<(), crate::db::DbError> {
        let digest = self.llm_digest(state).await;
        let summary = LeadSummary::from_conversation(state, digest);

        match self.store.insert_lead_summary(&summary) {
            Ok(id) => {
                tracing::info!(
                    session_id = %state.session_id,
                    lead_id = %id,
                    score = summary.score,
                    "lead summary stored"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    session_id = %state.session_id,
                    error = %e,
                    "lead summary insert failed"
                );
                Err(e)
            }
        }
    }

    async fn llm_digest(&self, state: &ConversationState) -> Option<String> {
        let history: Vec<Turn> = state.messages.iter().map(Turn::from_message).collect();
        let request = GenerationRequest::new(
            "Summarize this sales conversation in three sentences for a CRM \
             record: who the lead is, what they need, and what was demoed.",
            history,
            "Write the summary now.",
        )
        .with_max_tokens(DIGEST_MAX_TOKENS);

        match self.llm.generate(&request).await {
            Ok(reply) if !reply.text.trim().is_empty() => Some(reply.text),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    error = %e,
                    "digest generation failed, using fallback"
                );
                None
            }
        }
    }

    async fn synthesize(&self, session_id: &str, text: &str) -> Option<Vec<u8>> {
        let voice = self.voice.as_ref()?;
        match voice.synthesize(text).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "voice synthesis failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GeneratedReply, TextGenError};
    use crate::voice::VoiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ScriptedLlm {
        reply: String,
        fail: AtomicBool,
    }

    impl ScriptedLlm {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                fail: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: String::new(),
                fail: AtomicBool::new(true),
            })
        }
    }

    #[async_trait]
    impl TextGenService for ScriptedLlm {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GeneratedReply, TextGenError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TextGenError::server_error("scripted failure"));
            }
            Ok(GeneratedReply {
                text: self.reply.clone(),
                citations: Vec::new(),
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    struct BrokenVoice;

    #[async_trait]
    impl VoiceSynthesis for BrokenVoice {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, VoiceError> {
            Err(VoiceError::Network("down".to_string()))
        }
    }

    fn orchestrator(llm: Arc<dyn TextGenService>) -> TurnOrchestrator {
        TurnOrchestrator::new(
            llm,
            None,
            Arc::new(BroadcastHub::new()),
            LeadStore::open_in_memory().unwrap(),
        )
    }

    #[tokio::test]
    async fn successful_turn_appends_both_messages() {
        let orch = orchestrator(ScriptedLlm::ok("Nice to meet you, Alex!"));
        let state = ConversationState::new("s-1");

        let outcome = orch.run_turn(&state, "Alex").await;

        assert_eq!(outcome.state.stage, StageId::EmailRequest);
        assert_eq!(outcome.state.name.as_deref(), Some("Alex"));
        assert_eq!(outcome.state.messages.len(), 2);
        assert_eq!(outcome.reply, "Nice to meet you, Alex!");
    }

    #[tokio::test]
    async fn llm_failure_preserves_stage_and_tags_error() {
        let orch = orchestrator(ScriptedLlm::failing());
        let state = ConversationState::new("s-1");

        let outcome = orch.run_turn(&state, "Alex").await;

        // The stage does not advance past the failed turn.
        assert_eq!(outcome.state.stage, StageId::Greeting);
        assert_eq!(outcome.state.sidebar_activity, "turn_error");
        assert_eq!(outcome.reply, FAILURE_REPLY);
        // The user's message is kept.
        assert_eq!(outcome.state.messages.len(), 2);
        assert_eq!(outcome.state.messages[0].text, "Alex");
    }

    #[tokio::test]
    async fn email_turn_triggers_company_lookup_and_merge() {
        let orch = orchestrator(ScriptedLlm::ok(
            "Industry: Manufacturing. Acme makes anvils.",
        ));
        let mut state = ConversationState::new("s-1");
        state.stage = StageId::EmailRequest;
        state.name = Some("Alex".to_string());
        state.push_user("Alex");
        state.push_ai("What's your email?");

        let outcome = orch.run_turn(&state, "alex@acme.com").await;

        assert_eq!(outcome.state.stage, StageId::EmailCollected);
        let info = outcome.state.company_info.expect("company info");
        assert_eq!(info.domain, "acme.com");
        // Same scripted LLM serves the analysis call, so the merge lands.
        assert_eq!(info.industry.as_deref(), Some("Manufacturing"));
    }

    #[tokio::test]
    async fn finalizing_turn_stores_a_lead() {
        let orch = orchestrator(ScriptedLlm::ok("Here is your summary."));
        let mut state = ConversationState::new("s-1");
        state.stage = StageId::SummaryOffer;
        state.name = Some("Alex".to_string());
        state.email = Some("alex@acme.com".to_string());
        state.push_user("hello");
        state.push_ai("want a summary?");

        let outcome = orch.run_turn(&state, "yes please").await;

        assert_eq!(outcome.state.stage, StageId::Finalizing);
        let leads = orch.store().list_lead_summaries().unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].email.as_deref(), Some("alex@acme.com"));
        assert_eq!(leads[0].digest, "Here is your summary.");
    }

    #[tokio::test]
    async fn voice_failure_degrades_to_text_only() {
        let orch = TurnOrchestrator::new(
            ScriptedLlm::ok("hello"),
            Some(Arc::new(BrokenVoice)),
            Arc::new(BroadcastHub::new()),
            LeadStore::open_in_memory().unwrap(),
        );
        let state = ConversationState::new("s-1");

        let outcome = orch.run_turn(&state, "Alex").await;

        assert_eq!(outcome.reply, "hello");
        assert!(outcome.audio.is_none());
    }

    #[tokio::test]
    async fn capability_demo_moves_to_feedback_stage() {
        let orch = orchestrator(ScriptedLlm::ok("unused"));
        let mut state = ConversationState::new("s-1");
        state.stage = StageId::CapabilitySelection;

        let (next, result) = orch.run_capability(&state, CapabilityKind::Image).await;

        assert_eq!(next.stage, StageId::PostCapabilityFeedback);
        assert!(next.capabilities_shown.contains("image"));
        assert_eq!(result.capability, CapabilityKind::Image);
        // Demo output is appended as an AI message.
        assert_eq!(next.messages.len(), 1);
    }

    #[tokio::test]
    async fn turn_events_reach_subscribers() {
        let hub = Arc::new(BroadcastHub::new());
        let orch = TurnOrchestrator::new(
            ScriptedLlm::ok("hi"),
            None,
            hub.clone(),
            LeadStore::open_in_memory().unwrap(),
        );
        let mut rx = hub.subscribe("s-1");
        let state = ConversationState::new("s-1");

        let _ = orch.run_turn(&state, "Alex").await;

        let event = rx.recv().await.unwrap();
        match event {
            ActivityEvent::Reply { stage, text } => {
                assert_eq!(stage, StageId::EmailRequest);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
