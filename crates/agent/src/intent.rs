//! Keyword intent routing.

use learnpath_prompt::Flow;

/// Any of these (case-insensitive substring) routes a message to the roadmap flow.
pub const ROADMAP_KEYWORDS: [&str; 7] = [
    "roadmap",
    "learning path",
    "plan",
    "curriculum",
    "full-stack",
    "job-ready",
    "learning",
];

/// Pick the response flow for a message.
pub fn classify_intent(message: &str) -> Flow {
    let lower = message.to_lowercase();
    if ROADMAP_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Flow::Roadmap
    } else {
        Flow::Answer
    }
}
