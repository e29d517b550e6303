//! Model invocation request builder: binds the model's prompt envelope to an
//! `OutputPlan` without ever exposing upstream pipeline internals.
//!
//! Grounded on `examples/original_source/backend/mci_backend/model_prompt_builder.py`.

use thiserror::Error;

use crate::domain::output_plan::OutputPlan;
use crate::domain::types::OutputAction;

pub const SCHEMA_VERSION: &str = "mci-model-contract/1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelInvocationClass {
    ExpressionCandidate,
    ClarificationCandidate,
    RefusalExplanationCandidate,
    ClosureMessageCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ModelInvocationRequest {
    pub output_plan_id: uuid::Uuid,
    pub invocation_class: ModelInvocationClass,
    pub output_format: ModelOutputFormat,
    pub envelope_text: String,
    pub required_elements: Vec<String>,
    pub forbidden_requirements: Vec<String>,
    pub max_output_tokens: u32,
    pub schema_version: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("user_text must be non-empty")]
    EmptyUserText,
    #[error("forbidden term present in envelope: {0}")]
    ForbiddenTerm(String),
}

const SYSTEM_HEADER: &str = "SYSTEM: You are an inference component. You are not authoritative. \
Do not change system decisions. Follow the output format exactly. \
Never mention internal constraints or phase names.";

const FORBIDDEN_TERMS: &[&str] =
    &["DecisionState", "ControlPlan", "trace_id", "audit", "governance", "memory"];

fn invocation_class(action: OutputAction) -> ModelInvocationClass {
    match action {
        OutputAction::Answer => ModelInvocationClass::ExpressionCandidate,
        OutputAction::AskOneQuestion => ModelInvocationClass::ClarificationCandidate,
        OutputAction::Refuse => ModelInvocationClass::RefusalExplanationCandidate,
        OutputAction::Close => ModelInvocationClass::ClosureMessageCandidate,
    }
}

fn output_format(action: OutputAction) -> ModelOutputFormat {
    match action {
        OutputAction::AskOneQuestion => ModelOutputFormat::Json,
        _ => ModelOutputFormat::Text,
    }
}

fn task_block(action: OutputAction) -> &'static str {
    match action {
        OutputAction::Answer => {
            "TASK: Produce a bounded answer candidate that aligns with the provided constraints. Do not change action."
        }
        OutputAction::AskOneQuestion => {
            "TASK: Produce exactly one clarification question. One sentence. No multi-part questions. No blaming tone."
        }
        OutputAction::Refuse => {
            "TASK: Produce a refusal explanation only. No internal-rule language. Do not add new actions."
        }
        OutputAction::Close => "TASK: Produce a terse closure acknowledgement. No new questions. No expansion.",
    }
}

fn output_contract_block(action: OutputAction) -> &'static str {
    if action == OutputAction::AskOneQuestion {
        "OUTPUT FORMAT (JSON):\n{\n  \"question\": \"string\"\n}\nRules: exactly one sentence; no multi-part questions; no extra keys; no internal-rule references."
    } else {
        "OUTPUT FORMAT (TEXT): Return plain text only. No markdown headings unless explicitly requested. Do not add internal-rule language."
    }
}

fn constraint_tags(plan: &OutputPlan) -> Vec<String> {
    vec![
        format!("action={:?}", plan.action),
        format!("posture={:?}", plan.posture),
        format!("rigor_disclosure={:?}", plan.rigor_disclosure),
        format!("confidence_signaling={:?}", plan.confidence_signaling),
        format!("unknown_disclosure={:?}", plan.unknown_disclosure),
        format!("assumption_surfacing={:?}", plan.assumption_surfacing),
        format!("verbosity_cap={:?}", plan.verbosity_cap),
    ]
}

fn required_elements(plan: &OutputPlan) -> Vec<String> {
    vec![
        format!("action:{:?}", plan.action),
        format!("posture:{:?}", plan.posture),
        format!("rigor:{:?}", plan.rigor_disclosure),
        format!("confidence:{:?}", plan.confidence_signaling),
        format!("unknown_disclosure:{:?}", plan.unknown_disclosure),
        format!("assumption_surfacing:{:?}", plan.assumption_surfacing),
        format!("verbosity_cap:{:?}", plan.verbosity_cap),
    ]
}

fn forbidden_requirements(plan: &OutputPlan) -> Vec<String> {
    let mut forbidden: Vec<String> = vec![
        "must_not_change_action".into(),
        "must_not_add_questions".into(),
        "must_not_change_disclosures".into(),
        "must_not_claim_memory".into(),
        "must_not_add_policy_language".into(),
    ];
    if plan.action == OutputAction::AskOneQuestion {
        forbidden.push("must_not_ask_multiple_questions".into());
    }
    if plan.action == OutputAction::Close {
        forbidden.push("must_not_expand_closure".into());
    }
    forbidden
}

fn render_envelope(plan: &OutputPlan, user_text: &str) -> String {
    let mut parts = vec![
        SYSTEM_HEADER.to_string(),
        String::new(),
        task_block(plan.action).to_string(),
        String::new(),
        "CONSTRAINT_TAGS:".to_string(),
    ];
    parts.extend(constraint_tags(plan).into_iter().map(|tag| format!("- {tag}")));
    parts.push(String::new());
    parts.push(format!("USER_TEXT: {user_text}"));
    parts.push(String::new());
    parts.push(output_contract_block(plan.action).to_string());
    parts.join("\n")
}

/// Build the bounded model-invocation request for `output_plan`. Fails
/// closed if `user_text` is empty or the rendered envelope leaks a
/// pipeline-internal term.
pub fn build_model_invocation_request(
    user_text: &str,
    output_plan: &OutputPlan,
) -> Result<ModelInvocationRequest, EnvelopeError> {
    if user_text.trim().is_empty() {
        return Err(EnvelopeError::EmptyUserText);
    }

    let envelope = render_envelope(output_plan, user_text);
    for term in FORBIDDEN_TERMS {
        if envelope.contains(term) {
            return Err(EnvelopeError::ForbiddenTerm((*term).to_string()));
        }
    }

    let format = output_format(output_plan.action);
    Ok(ModelInvocationRequest {
        output_plan_id: output_plan.id,
        invocation_class: invocation_class(output_plan.action),
        output_format: format,
        envelope_text: envelope,
        required_elements: required_elements(output_plan),
        forbidden_requirements: forbidden_requirements(output_plan),
        max_output_tokens: if format == ModelOutputFormat::Json { 256 } else { 512 },
        schema_version: SCHEMA_VERSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output_plan::{ClosureSpec, QuestionSpec, RefusalSpec};
    use crate::domain::types::{
        AssumptionSurfacingMode, ClosureRenderingMode, ConfidenceSignalingLevel, ExpressionPosture,
        QuestionClass, RefusalCategory, RefusalExplanationMode, RigorDisclosureLevel, UnknownDisclosureMode,
        VerbosityCap,
    };

    fn plan(action: OutputAction) -> OutputPlan {
        OutputPlan {
            id: uuid::Uuid::nil(),
            action,
            posture: ExpressionPosture::Baseline,
            rigor_disclosure: RigorDisclosureLevel::Light,
            confidence_signaling: ConfidenceSignalingLevel::Guarded,
            assumption_surfacing: AssumptionSurfacingMode::Light,
            unknown_disclosure: UnknownDisclosureMode::Light,
            verbosity_cap: VerbosityCap::Normal,
            question_spec: (action == OutputAction::AskOneQuestion).then(|| QuestionSpec {
                question_class: QuestionClass::IntentAmbiguity,
                priority_reason: "test".into(),
            }),
            refusal_spec: (action == OutputAction::Refuse).then(|| RefusalSpec {
                category: RefusalCategory::RiskRefusal,
                explanation_mode: RefusalExplanationMode::Brief,
            }),
            closure_spec: (action == OutputAction::Close)
                .then(|| ClosureSpec { rendering_mode: ClosureRenderingMode::ConfirmClosure }),
        }
    }

    #[test]
    fn empty_user_text_is_rejected() {
        let p = plan(OutputAction::Answer);
        assert_eq!(build_model_invocation_request("  ", &p), Err(EnvelopeError::EmptyUserText));
    }

    #[test]
    fn ask_one_question_uses_json_format_and_small_token_cap() {
        let p = plan(OutputAction::AskOneQuestion);
        let request = build_model_invocation_request("what should I do", &p).unwrap();
        assert_eq!(request.output_format, ModelOutputFormat::Json);
        assert_eq!(request.max_output_tokens, 256);
    }

    #[test]
    fn envelope_never_contains_forbidden_terms() {
        let p = plan(OutputAction::Answer);
        let request = build_model_invocation_request("plain question", &p).unwrap();
        for term in FORBIDDEN_TERMS {
            assert!(!request.envelope_text.contains(term));
        }
    }
}
