//! Conversation-stage state machine
//!
//! Pure state transitions in the Elm style: previous state + user message in,
//! next state out. All I/O (broadcast, text generation, voice, persistence)
//! happens in the runtime layer, keyed off the fields the machine emits.

mod guidance;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use state::{
    activity, CompanyInfo, ConversationState, Message, Sender, StageId, MAX_MESSAGES_PER_SESSION,
};
pub use transition::transition;
