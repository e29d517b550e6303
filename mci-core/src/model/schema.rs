//! Strict per-action JSON output schemas for model candidates (edge contract).
//!
//! Grounded on `examples/original_source/backend/mci_backend/model_output_schema.py`.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::types::{ClosureState, QuestionClass, RefusalCategory};

pub const MAX_TEXT_LEN: usize = 6000;
pub const MAX_LIST_LEN: usize = 10;
pub const MAX_LIST_ITEM_LEN: usize = 400;
pub const MAX_QUESTION_LEN: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("output must be non-empty string containing JSON")]
    Empty,
    #[error("markdown fenced code blocks are forbidden")]
    MarkdownFenced,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("top-level JSON must be an object")]
    NotAnObject,
    #[error("schema violation: {0}")]
    Violation(String),
}

pub fn parse_model_json(raw_text: &str) -> Result<Value, SchemaError> {
    if raw_text.trim().is_empty() {
        return Err(SchemaError::Empty);
    }
    if raw_text.trim_start().starts_with("```") {
        return Err(SchemaError::MarkdownFenced);
    }
    let parsed: Value = serde_json::from_str(raw_text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    if !parsed.is_object() {
        return Err(SchemaError::NotAnObject);
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerPayload {
    pub answer_text: String,
    #[serde(default)]
    pub assumptions: Option<Vec<String>>,
    #[serde(default)]
    pub unknowns: Option<Vec<String>>,
}

fn check_bounded_list(name: &str, items: &Option<Vec<String>>) -> Result<(), SchemaError> {
    let Some(items) = items else { return Ok(()) };
    if items.len() > MAX_LIST_LEN {
        return Err(SchemaError::Violation(format!("{name} length exceeds {MAX_LIST_LEN}")));
    }
    for item in items {
        if item.trim().is_empty() {
            return Err(SchemaError::Violation(format!("{name} items must be non-empty strings")));
        }
        if item.chars().count() > MAX_LIST_ITEM_LEN {
            return Err(SchemaError::Violation(format!("{name} item exceeds {MAX_LIST_ITEM_LEN}")));
        }
    }
    Ok(())
}

pub fn validate_answer_payload(payload: Value) -> Result<AnswerPayload, SchemaError> {
    let answer: AnswerPayload =
        serde_json::from_value(payload).map_err(|e| SchemaError::Violation(e.to_string()))?;
    if answer.answer_text.is_empty() || answer.answer_text.chars().count() > MAX_TEXT_LEN {
        return Err(SchemaError::Violation("answer_text length out of bounds".into()));
    }
    check_bounded_list("assumptions", &answer.assumptions)?;
    check_bounded_list("unknowns", &answer.unknowns)?;
    Ok(answer)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AskOneQuestionPayload {
    pub question: String,
    pub question_class: QuestionClass,
    pub priority_reason: String,
}

fn looks_multi_part(question: &str) -> bool {
    let has_linebreak_between_questions =
        question.matches('?').count() > 1 && (question.contains('\n') || question.contains('\r'));
    let has_and_question = question.to_ascii_lowercase().contains("? and ?");
    has_linebreak_between_questions || has_and_question
}

pub fn validate_ask_payload(payload: Value) -> Result<AskOneQuestionPayload, SchemaError> {
    let ask: AskOneQuestionPayload =
        serde_json::from_value(payload).map_err(|e| SchemaError::Violation(e.to_string()))?;
    if ask.question.is_empty() || ask.question.chars().count() > MAX_QUESTION_LEN {
        return Err(SchemaError::Violation("question length out of bounds".into()));
    }
    let q = ask.question.trim();
    if q.matches('?').count() != 1 {
        return Err(SchemaError::Violation("question must contain exactly one question mark".into()));
    }
    if looks_multi_part(q) {
        return Err(SchemaError::Violation("multi-question phrasing detected".into()));
    }
    Ok(ask)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefusalPayload {
    pub refusal_category: RefusalCategory,
    pub refusal_text: String,
    #[serde(default)]
    pub safe_next_step: Option<String>,
}

const BANNED_REFUSAL_PHRASES: &[&str] = &["as an ai model", "policy"];

pub fn validate_refusal_payload(payload: Value) -> Result<RefusalPayload, SchemaError> {
    let refusal: RefusalPayload =
        serde_json::from_value(payload).map_err(|e| SchemaError::Violation(e.to_string()))?;
    if refusal.refusal_text.is_empty() || refusal.refusal_text.chars().count() > MAX_TEXT_LEN {
        return Err(SchemaError::Violation("refusal_text length out of bounds".into()));
    }
    let lowered = refusal.refusal_text.to_ascii_lowercase();
    for banned in BANNED_REFUSAL_PHRASES {
        if lowered.contains(banned) {
            return Err(SchemaError::Violation("policy or loophole language forbidden in refusal_text".into()));
        }
    }
    if let Some(step) = &refusal.safe_next_step {
        if step.trim().is_empty() {
            return Err(SchemaError::Violation("safe_next_step, if provided, must be non-empty".into()));
        }
    }
    Ok(refusal)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClosePayload {
    pub closure_state: ClosureState,
    #[serde(default)]
    pub closure_text: String,
}

pub fn validate_close_payload(payload: Value) -> Result<ClosePayload, SchemaError> {
    let close: ClosePayload =
        serde_json::from_value(payload).map_err(|e| SchemaError::Violation(e.to_string()))?;
    if close.closure_text.chars().count() > MAX_TEXT_LEN {
        return Err(SchemaError::Violation("closure_text exceeds max length".into()));
    }
    if close.closure_state != ClosureState::Closing && close.closure_text.is_empty() {
        return Err(SchemaError::Violation("non-silence closure requires text".into()));
    }
    if close.closure_text.contains('?') {
        return Err(SchemaError::Violation("closure must not ask questions".into()));
    }
    Ok(close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn markdown_fence_is_rejected() {
        assert_eq!(parse_model_json("```json\n{}\n```"), Err(SchemaError::MarkdownFenced));
    }

    #[test]
    fn answer_payload_rejects_unknown_fields() {
        let payload = json!({"answer_text": "hi", "unexpected": 1});
        assert!(validate_answer_payload(payload).is_err());
    }

    #[test]
    fn ask_payload_requires_single_question_mark() {
        let payload = json!({
            "question": "What is this? And what is that?",
            "question_class": "INTENT_AMBIGUITY",
            "priority_reason": "test"
        });
        assert!(validate_ask_payload(payload).is_err());
    }

    #[test]
    fn close_payload_rejects_questions() {
        let payload = json!({"closure_state": "CLOSING", "closure_text": "Are we done?"});
        assert!(validate_close_payload(payload).is_err());
    }
}
