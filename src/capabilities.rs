//! Capability demo stubs
//!
//! Each demo produces canned output, records itself in `capabilities_shown`,
//! and drops the conversation into `post_capability_feedback` with the
//! in-stage counter forced to zero. Demos are the only path that moves the
//! stage outside the transition function.

use crate::stage_machine::ConversationState;
use serde::{Deserialize, Serialize};

/// The demoable capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Image,
    Website,
    Video,
    Document,
    Code,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::Image,
        CapabilityKind::Website,
        CapabilityKind::Video,
        CapabilityKind::Document,
        CapabilityKind::Code,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Image => "image",
            CapabilityKind::Website => "website",
            CapabilityKind::Video => "video",
            CapabilityKind::Document => "document",
            CapabilityKind::Code => "code",
        }
    }

    /// Best-effort detection of which capability a free-text request names.
    /// Returns `None` when no capability word appears.
    pub fn detect(input: &str) -> Option<Self> {
        let lower = input.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.contains(kind.as_str()))
    }
}

/// Output of one capability demo.
#[derive(Debug, Clone, Serialize)]
pub struct DemoResult {
    pub capability: CapabilityKind,
    pub output: String,
}

/// Run a demo stub: canned output, capability recorded, stage forced to
/// `post_capability_feedback`.
pub fn run_demo(state: &mut ConversationState, kind: CapabilityKind) -> DemoResult {
    let output = match kind {
        CapabilityKind::Image => {
            "Here's a quick look at image understanding: I described the layout, \
             key objects, and any visible text in a sample product screenshot."
        }
        CapabilityKind::Website => {
            "Website analysis demo: I pulled the headline value proposition, \
             navigation structure, and calls-to-action from a sample landing page."
        }
        CapabilityKind::Video => {
            "Video analysis demo: I produced a scene-by-scene outline and a short \
             summary of a sample product walkthrough."
        }
        CapabilityKind::Document => {
            "Document analysis demo: I extracted the key terms, dates, and action \
             items from a sample PDF contract."
        }
        CapabilityKind::Code => {
            "Code execution demo: I wrote and ran a short script against sample \
             data and returned the computed result inline."
        }
    };

    state.enter_post_capability_feedback(kind.as_str());

    DemoResult {
        capability: kind,
        output: output.to_string(),
    }
}
