//! The patch-only DSL operated on by deep-think passes: `Decision`, patch
//! paths, patch values, and `DecisionDelta`.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/schema.py`.

use serde::{Deserialize, Serialize};

use crate::domain::types::{
    MAX_ALTERNATIVES_COUNT, MAX_ALTERNATIVE_CHARS, MAX_ANSWER_CHARS, MAX_CLARIFY_QUESTION_CHARS,
    MAX_RATIONALE_CHARS,
};

/// The subset of chat output this pipeline's passes are allowed to rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub action: DecisionAction,
    pub answer: String,
    pub rationale: String,
    pub clarify_question: String,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    #[default]
    Answer,
    AskClarify,
    Refuse,
    Fallback,
}

/// Fixed set-only patch path allowlist. Order is the canonical ascending
/// application order for the patch applier.
pub const ALLOWED_PATCH_PATHS: &[&str] = &[
    "decision.action",
    "decision.alternatives",
    "decision.answer",
    "decision.clarify_question",
    "decision.rationale",
];

/// Any path containing one of these substrings is rejected regardless of
/// allowlist membership.
pub const FORBIDDEN_PATH_PATTERNS: &[&str] = &[
    "entitlement",
    "tier",
    "cap",
    "routing",
    "pass_count",
    "breaker",
    "budget",
    "clamp",
    "safety",
    "security",
    "header",
    "cookie",
    "auth",
    "token",
    "policy",
];

pub fn is_allowed_path(path: &str) -> bool {
    ALLOWED_PATCH_PATHS.contains(&path)
}

pub fn is_forbidden_path(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    FORBIDDEN_PATH_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// A patch value. Only `set` is supported; the op itself carries no
/// discriminant beyond this type's existence, matching the DSL where `op`
/// is always the literal `"set"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PatchValue {
    Action(DecisionAction),
    Text(String),
    StringList(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchOp {
    pub path: String,
    pub value: PatchValue,
}

impl PatchOp {
    pub fn set(path: &str, value: PatchValue) -> Self {
        PatchOp { path: path.to_string(), value }
    }
}

pub type DecisionDelta = Vec<PatchOp>;

pub struct PathSpec {
    pub max_length: Option<usize>,
    pub max_items: Option<usize>,
    pub max_item_length: Option<usize>,
}

pub fn path_spec(path: &str) -> Option<PathSpec> {
    match path {
        "decision.action" => Some(PathSpec { max_length: None, max_items: None, max_item_length: None }),
        "decision.answer" => Some(PathSpec { max_length: Some(MAX_ANSWER_CHARS), max_items: None, max_item_length: None }),
        "decision.rationale" => Some(PathSpec { max_length: Some(MAX_RATIONALE_CHARS), max_items: None, max_item_length: None }),
        "decision.clarify_question" => {
            Some(PathSpec { max_length: Some(MAX_CLARIFY_QUESTION_CHARS), max_items: None, max_item_length: None })
        }
        "decision.alternatives" => Some(PathSpec {
            max_length: None,
            max_items: Some(MAX_ALTERNATIVES_COUNT),
            max_item_length: Some(MAX_ALTERNATIVE_CHARS),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_is_sorted_ascending() {
        let mut sorted = ALLOWED_PATCH_PATHS.to_vec();
        sorted.sort();
        assert_eq!(ALLOWED_PATCH_PATHS, sorted.as_slice());
    }

    #[test]
    fn forbidden_pattern_catches_budget_regardless_of_case() {
        assert!(is_forbidden_path("decision.BUDGET_limit"));
    }

    #[test]
    fn decision_action_path_has_no_length_spec() {
        let spec = path_spec("decision.action").unwrap();
        assert!(spec.max_length.is_none());
    }
}
