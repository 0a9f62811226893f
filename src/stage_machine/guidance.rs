//! Per-stage guidance text handed to the text-generation step.
//!
//! These strings instruct the model; they are never shown verbatim to the
//! lead. Entry variants fire when a stage is entered, hold variants when the
//! conversation stays put and re-prompts.

pub(crate) fn greeting_entry() -> String {
    "Warmly welcome the visitor to the F.B/c demo and ask for their first name. \
     Keep it to one or two sentences."
        .to_string()
}

pub(crate) fn greeting_hold() -> String {
    "The visitor has not given a usable first name yet. Ask again for just \
     their name, politely and briefly."
        .to_string()
}

pub(crate) fn email_request_entry(name: &str) -> String {
    format!(
        "Thank {name} by name and ask for their work email so we can tailor \
         the demo to their company. One sentence."
    )
}

pub(crate) fn email_request_hold() -> String {
    "The last message was not a valid email address. Ask again for a work \
     email, without being pushy."
        .to_string()
}

pub(crate) fn email_collected_entry(company: Option<&str>) -> String {
    let company = company.unwrap_or("their company");
    format!(
        "Acknowledge the email and mention you are taking a quick look at \
         {company} in the background. Do not list findings yet."
    )
}

pub(crate) fn initial_discovery_entry() -> String {
    "Company lookup is done. Ask one open question about what the visitor's \
     team does day to day and where AI might help."
        .to_string()
}

pub(crate) fn initial_discovery_hold() -> String {
    "Ask a probing follow-up about their business context: team size, current \
     tooling, or the bottleneck they mentioned."
        .to_string()
}

pub(crate) fn capability_introduction_entry() -> String {
    "Offer to demonstrate one AI capability live: image description, website \
     or document analysis, video analysis, or code execution. Ask which one \
     they would like to try."
        .to_string()
}

pub(crate) fn capability_selection_entry() -> String {
    "Wait for the visitor to pick a capability. If they name one, confirm it \
     enthusiastically in a single sentence."
        .to_string()
}

pub(crate) fn capability_selection_hold() -> String {
    "The visitor has not picked a capability yet. Briefly restate the options \
     and ask which sounds most useful for their work."
        .to_string()
}

pub(crate) fn capability_suggestion_entry() -> String {
    "The visitor seems unsure. Suggest one concrete capability demo yourself \
     (for example: analyze their company website) and ask if that works."
        .to_string()
}

pub(crate) fn post_capability_feedback_entry(capability: &str) -> String {
    format!(
        "The {capability} demo just ran. Ask what they thought of it and how \
         something like this would fit their workflow."
    )
}

pub(crate) fn solution_discussion_entry() -> String {
    "Connect what the visitor has seen to F.B/c services: AI consulting, \
     workshops, and custom chatbot builds. Relate it to their stated business \
     context."
        .to_string()
}

pub(crate) fn solution_discussion_hold() -> String {
    "Keep discussing fit: explain how an F.B/c engagement usually starts and \
     answer their questions about the services."
        .to_string()
}

pub(crate) fn summary_offer_entry() -> String {
    "Offer to generate a short written summary of this conversation and the \
     capabilities explored, and ask for a clear yes or no."
        .to_string()
}

pub(crate) fn summary_offer_hold() -> String {
    "The visitor neither accepted nor declined the summary. Re-confirm once: \
     would they like the summary, yes or no?"
        .to_string()
}

pub(crate) fn finalizing_entry() -> String {
    "Consent received. Tell the visitor their summary is being prepared and \
     invite them to book a follow-up call with Farzad."
        .to_string()
}

pub(crate) fn finalizing_hold() -> String {
    "The conversation is wrapping up. Answer briefly, remind them the summary \
     is on its way, and point to the booking option."
        .to_string()
}

pub(crate) fn limit_reached() -> String {
    "The session message limit has been reached. Politely explain the demo is \
     capped, and point the visitor to the booking link to continue with a \
     human."
        .to_string()
}

pub(crate) fn recovery() -> String {
    "Something went out of sync with the conversation flow. Restart gently: \
     welcome the visitor and ask for their first name."
        .to_string()
}
