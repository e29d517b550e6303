//! Consolidated model-output verifier and sanitizer (fail-closed).
//!
//! Merges the two Python validation layers `model_output_verify.py` and
//! `model_candidate_validation.py` into one verifier, per this pipeline's
//! single-verifier design.

use serde_json::{json, Value};

use crate::domain::output_plan::OutputPlan;
use crate::domain::types::{ConfidenceSignalingLevel, OutputAction, UnknownDisclosureMode};

use super::envelope::ModelOutputFormat;
use super::schema::{
    parse_model_json, validate_ask_payload, validate_answer_payload, validate_close_payload,
    validate_refusal_payload, AnswerPayload, AskOneQuestionPayload, ClosePayload, RefusalPayload, SchemaError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFailureType {
    NonJson,
    SchemaMismatch,
    ContractViolation,
    ForbiddenContent,
    Timeout,
    ProviderError,
}

#[derive(Debug, Clone)]
pub struct ModelFailure {
    pub failure_type: ModelFailureType,
    pub reason_code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ModelInvocationResult {
    pub ok: bool,
    pub output_text: Option<String>,
    pub output_json: Option<Value>,
    pub failure: Option<ModelFailure>,
}

impl ModelInvocationResult {
    pub fn success_text(text: String) -> Self {
        ModelInvocationResult { ok: true, output_text: Some(text), output_json: None, failure: None }
    }

    pub fn success_json(value: Value) -> Self {
        ModelInvocationResult { ok: true, output_text: None, output_json: Some(value), failure: None }
    }

    pub fn failure(failure_type: ModelFailureType, reason_code: &'static str, message: impl Into<String>) -> Self {
        ModelInvocationResult {
            ok: false,
            output_text: None,
            output_json: None,
            failure: Some(ModelFailure { failure_type, reason_code, message: message.into() }),
        }
    }
}

const FORBIDDEN_PHRASES: &[&str] = &[
    "i remember",
    "as you said earlier",
    "previous conversation",
    "system prompt",
    "developer message",
    "i will change the rules",
    "override",
    "i will now do",
    "i'll keep checking",
    "i accessed",
    "i searched",
    "i called api",
    "i browsed",
    "i learned",
    "i updated my rules",
    "based on previous chats",
];

const ADVICE_PHRASES: &[&str] = &["you should", "you must", "you need to"];
const MULTI_QUESTION_HINTS: &[&str] = &["and also", "also", "plus", "another question", "as well"];
const ANSWER_REFUSAL_PHRASES: &[&str] =
    &["i cannot comply", "i can't help with that", "as an ai model", "as an ai language model", "i must refuse", "i will not"];
const POLICY_PHRASES: &[&str] = &["policy", "as per policy", "as an ai model"];
const ABSOLUTE_LANGUAGE_PHRASES: &[&str] = &["100%", "certain", "definitely", "absolutely"];

fn check_forbidden_phrases(text: &str) -> Option<ModelInvocationResult> {
    let lowered = text.to_ascii_lowercase();
    FORBIDDEN_PHRASES.iter().find(|p| lowered.contains(**p)).map(|phrase| {
        ModelInvocationResult::failure(
            ModelFailureType::ForbiddenContent,
            "FORBIDDEN_PHRASE",
            format!("forbidden phrase: {phrase}"),
        )
    })
}

fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}'))
        .collect::<String>()
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

fn verify_answer(answer: &AnswerPayload, plan: &OutputPlan, has_explicit_unknowns: bool) -> Option<ModelInvocationResult> {
    if let Some(failure) = check_forbidden_phrases(&answer.answer_text) {
        return Some(failure);
    }
    let lowered = answer.answer_text.to_ascii_lowercase();
    if ANSWER_REFUSAL_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ForbiddenContent,
            "REFUSAL_IN_ANSWER",
            "refusal phrasing in answer",
        ));
    }
    if POLICY_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ForbiddenContent,
            "POLICY_LANGUAGE",
            "policy language not allowed",
        ));
    }
    if plan.confidence_signaling != ConfidenceSignalingLevel::Explicit
        && ABSOLUTE_LANGUAGE_PHRASES.iter().any(|p| lowered.contains(p))
    {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "OVERCONFIDENT",
            "overconfident language not allowed",
        ));
    }
    if plan.unknown_disclosure != UnknownDisclosureMode::None {
        let tokens = ["unknown", "uncertain", "not sure", "unclear", "cannot confirm"];
        if tokens.iter().all(|t| !lowered.contains(t)) {
            return Some(ModelInvocationResult::failure(
                ModelFailureType::ContractViolation,
                "MISSING_UNKNOWN_DISCLOSURE",
                "explicit unknown disclosure required",
            ));
        }
    }
    if plan.unknown_disclosure == UnknownDisclosureMode::None && has_explicit_unknowns {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "UNKNOWN_SUPPRESSED",
            "unknowns present but disclosure set to NONE",
        ));
    }
    None
}

fn verify_ask_one(ask: &AskOneQuestionPayload) -> Option<ModelInvocationResult> {
    let lowered = ask.question.to_ascii_lowercase();
    if MULTI_QUESTION_HINTS.iter().any(|h| lowered.contains(h)) {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "MULTI_QUESTION",
            "multi-question phrasing detected",
        ));
    }
    if ADVICE_PHRASES.iter().any(|a| lowered.contains(a)) {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "QUESTION_CONTAINS_ADVICE",
            "question must not include advice",
        ));
    }
    check_forbidden_phrases(&ask.question)
}

fn verify_refusal(refusal: &RefusalPayload, plan: &OutputPlan) -> Option<ModelInvocationResult> {
    if let Some(failure) = check_forbidden_phrases(&refusal.refusal_text) {
        return Some(failure);
    }
    if let Some(spec) = &plan.refusal_spec {
        if refusal.refusal_category != spec.category {
            return Some(ModelInvocationResult::failure(
                ModelFailureType::ContractViolation,
                "REFUSAL_CATEGORY_MISMATCH",
                "refusal category mismatch",
            ));
        }
    }
    None
}

fn verify_close(close: &ClosePayload) -> Option<ModelInvocationResult> {
    if let Some(failure) = check_forbidden_phrases(&close.closure_text) {
        return Some(failure);
    }
    if close.closure_text.contains('?') {
        return Some(ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "QUESTION_IN_CLOSE",
            "closure must not ask questions",
        ));
    }
    None
}

/// Verify and sanitize a raw model result against `output_plan`. Always
/// fails closed: any parse or semantic mismatch returns `ok: false` rather
/// than guessing at a repaired payload.
pub fn verify_and_sanitize_model_output(
    model_result: &ModelInvocationResult,
    output_format: ModelOutputFormat,
    output_plan: &OutputPlan,
    has_explicit_unknowns: bool,
) -> ModelInvocationResult {
    if !model_result.ok {
        return model_result.clone();
    }

    let payload = match &model_result.output_json {
        Some(v) => v.clone(),
        None => match parse_model_json(model_result.output_text.as_deref().unwrap_or("")) {
            Ok(v) => v,
            Err(err) => {
                return ModelInvocationResult::failure(ModelFailureType::NonJson, "NON_JSON", err.to_string());
            }
        },
    };

    // TEXT-format answer candidates arrive as raw text, not JSON; wrap them
    // into the same payload shape the schema validator expects.
    let payload = if output_format == ModelOutputFormat::Text && output_plan.action == OutputAction::Answer {
        json!({"answer_text": model_result.output_text.clone().unwrap_or_default()})
    } else {
        payload
    };

    match output_plan.action {
        OutputAction::Answer => match validate_answer_payload(payload) {
            Ok(answer) => verify_answer(&answer, output_plan, has_explicit_unknowns)
                .unwrap_or_else(|| ModelInvocationResult::success_text(sanitize_text(&answer.answer_text))),
            Err(err) => schema_failure(err),
        },
        OutputAction::AskOneQuestion => match validate_ask_payload(payload) {
            Ok(ask) => verify_ask_one(&ask).unwrap_or_else(|| {
                ModelInvocationResult::success_json(json!({
                    "question": sanitize_text(&ask.question),
                    "question_class": format!("{:?}", ask.question_class),
                    "priority_reason": ask.priority_reason,
                }))
            }),
            Err(err) => schema_failure(err),
        },
        OutputAction::Refuse => match validate_refusal_payload(payload) {
            Ok(refusal) => verify_refusal(&refusal, output_plan)
                .unwrap_or_else(|| ModelInvocationResult::success_text(sanitize_text(&refusal.refusal_text))),
            Err(err) => schema_failure(err),
        },
        OutputAction::Close => match validate_close_payload(payload) {
            Ok(close) => verify_close(&close)
                .unwrap_or_else(|| ModelInvocationResult::success_text(sanitize_text(&close.closure_text))),
            Err(err) => schema_failure(err),
        },
    }
}

fn schema_failure(err: SchemaError) -> ModelInvocationResult {
    let (reason_code, failure_type) = match &err {
        SchemaError::Violation(msg) if msg.contains("policy or loophole") => {
            ("FORBIDDEN_CONTENT", ModelFailureType::ForbiddenContent)
        }
        _ => ("SCHEMA_MISMATCH", ModelFailureType::SchemaMismatch),
    };
    ModelInvocationResult::failure(failure_type, reason_code, err.to_string())
}
