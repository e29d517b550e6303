//! Five deterministic, rule-based passes. Each is a pure function
//! `(state, context) -> (delta, cost_units, duration_ms)`.

pub mod alternatives;
pub mod counterarg;
pub mod refine;
pub mod regret;
pub mod stress_test;

use crate::deepthink::decision::{Decision, DecisionDelta};
use crate::domain::types::PassType;

/// Everything a pass needs beyond the current `Decision`. Carries the
/// request text the passes classify against; nothing else leaks in, and
/// nothing here is ever serialized into telemetry.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub request_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassRunResult {
    pub pass_type: PassType,
    pub delta: DecisionDelta,
    pub cost_units: u32,
    pub duration_ms: u32,
}

/// Forbidden substrings shared by every pass's clarify-question sanitizer.
pub const FORBIDDEN_CLARIFY_PHRASES: &[&str] = &[
    "upload",
    "attach",
    "run",
    "command",
    "terminal",
    "log",
    "credentials",
    "token",
    "api key",
    "screenshot",
    "execute",
    "shell",
    "script",
    "install",
];

fn tokenize(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()).collect()
}

/// True if `phrase` (one or more words) appears as a contiguous run of whole
/// tokens in `tokens`. Word-boundary match, not substring: `"run"` does not
/// match the token `"runtime"`.
fn contains_phrase(tokens: &[&str], phrase: &str) -> bool {
    let phrase_tokens: Vec<&str> = phrase.split_whitespace().collect();
    if phrase_tokens.is_empty() {
        return false;
    }
    tokens.windows(phrase_tokens.len()).any(|window| window == phrase_tokens.as_slice())
}

pub fn sanitize_clarify_question(question: &str) -> String {
    let lowered = question.to_ascii_lowercase();
    let tokens = tokenize(&lowered);
    if FORBIDDEN_CLARIFY_PHRASES.iter().any(|phrase| contains_phrase(&tokens, phrase)) {
        "Could you provide more specific details about your request?".to_string()
    } else {
        question.to_string()
    }
}

/// Run a single pass, dispatching on its type.
pub fn run_pass(pass_type: PassType, decision: &Decision, ctx: &PassContext) -> PassRunResult {
    match pass_type {
        PassType::Refine => refine::run(decision, ctx),
        PassType::Counterarg => counterarg::run(decision, ctx),
        PassType::StressTest => stress_test::run(decision, ctx),
        PassType::Alternatives => alternatives::run(decision, ctx),
        PassType::Regret => regret::run(decision, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_forbidden_phrase() {
        assert_eq!(
            sanitize_clarify_question("please upload your logs"),
            "Could you provide more specific details about your request?"
        );
    }

    #[test]
    fn sanitize_passes_through_safe_question() {
        assert_eq!(sanitize_clarify_question("What is your budget?"), "What is your budget?");
    }

    #[test]
    fn sanitize_blocks_standalone_word_but_not_its_superstring() {
        assert_eq!(
            sanitize_clarify_question("please run this for me"),
            "Could you provide more specific details about your request?"
        );
        let question = "To answer safely, I need: (1) the programming language or runtime, and (2) your \
environment details (OS, version, etc.).";
        assert_eq!(sanitize_clarify_question(question), question);
    }
}
