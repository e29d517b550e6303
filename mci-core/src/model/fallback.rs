//! Deterministic fallback rendering: produces a safe candidate without any
//! model call, activated whenever invocation or verification fails.
//!
//! Grounded on `examples/original_source/backend/mci_backend/fallback_rendering.py`.

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::decision_state::DecisionState;
use crate::domain::output_plan::OutputPlan;
use crate::domain::types::{
    AssumptionSurfacingMode, ClosureRenderingMode, ConfidenceSignalingLevel, OutputAction, RefusalCategory,
    RefusalExplanationMode, UnknownDisclosureMode,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FallbackError {
    #[error("question_spec required for ASK_ONE_QUESTION")]
    MissingQuestionSpec,
    #[error("refusal_spec required for REFUSE")]
    MissingRefusalSpec,
    #[error("closure_spec required for CLOSE")]
    MissingClosureSpec,
}

#[derive(Debug, Clone)]
pub struct FallbackContent {
    pub text: Option<String>,
    pub json: Option<Value>,
}

fn sanitize(text: &str) -> String {
    text.replace("```", "").replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

fn cap_length(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect::<String>().trim_end().to_string()
}

fn render_answer(plan: &OutputPlan) -> String {
    let fallback_text = "I'm currently operating in a limited mode and may not be able to provide \
a complete answer. Please try rephrasing your question or try again shortly.";
    cap_length(&sanitize(fallback_text), plan.verbosity_cap.char_limit())
}

fn question_template(class: crate::domain::types::QuestionClass) -> &'static str {
    use crate::domain::types::QuestionClass::*;
    match class {
        SafetyLegal => "What is the main safety or compliance concern you see here?",
        Irreversibility => "What would make this decision easy to reverse if needed?",
        Responsibility => "Who else is affected by this besides you?",
        ConstraintGap => "What constraint or boundary matters most right now?",
        IntentAmbiguity => "What is the single most important detail I should focus on?",
        FallbackInformational => "What is the single key detail I should know?",
    }
}

fn render_question(plan: &OutputPlan) -> Result<Value, FallbackError> {
    let spec = plan.question_spec.as_ref().ok_or(FallbackError::MissingQuestionSpec)?;
    let template = question_template(spec.question_class);
    let mut question = sanitize(template);
    if !question.contains('?') {
        question.push('?');
    }
    let question = format!("{}?", question.split('?').next().unwrap_or(&question).trim());
    Ok(json!({
        "question": question,
        "question_class": format!("{:?}", spec.question_class),
        "priority_reason": spec.priority_reason,
    }))
}

fn refusal_template(category: RefusalCategory) -> &'static str {
    use RefusalCategory::*;
    match category {
        None => "I have to refuse because it is not safe to proceed.",
        RiskRefusal => "I have to refuse because proceeding is unsafe.",
        CapabilityRefusal => "I have to refuse because I cannot safely provide that.",
        GovernanceRefusal => "I have to refuse because this request is blocked for safety reasons.",
        EpistemicRefusal => "I have to refuse because there is not enough reliable information.",
    }
}

fn render_refusal(plan: &OutputPlan) -> Result<String, FallbackError> {
    let spec = plan.refusal_spec.as_ref().ok_or(FallbackError::MissingRefusalSpec)?;
    let mut template = refusal_template(spec.category).to_string();
    if spec.explanation_mode == RefusalExplanationMode::Detailed {
        template = format!("{template} This keeps you safe.");
    }
    Ok(cap_length(&sanitize(&template), plan.verbosity_cap.char_limit()))
}

fn render_close(plan: &OutputPlan) -> Result<String, FallbackError> {
    let spec = plan.closure_spec.as_ref().ok_or(FallbackError::MissingClosureSpec)?;
    Ok(match spec.rendering_mode {
        ClosureRenderingMode::Silence => String::new(),
        ClosureRenderingMode::ConfirmClosure => "Got it. Closing out.".to_string(),
        ClosureRenderingMode::BriefSummaryAndStop => "Noted. Closing this interaction now.".to_string(),
    })
}

fn render_unknown_line(plan: &OutputPlan, state: &DecisionState) -> Option<&'static str> {
    if plan.unknown_disclosure == UnknownDisclosureMode::None {
        return None;
    }
    if !state.explicit_unknown_zone.is_empty() {
        return Some("Unknown: Some factors are not yet known.");
    }
    None
}

fn render_assumption_line(plan: &OutputPlan) -> Option<&'static str> {
    match plan.assumption_surfacing {
        AssumptionSurfacingMode::None => None,
        AssumptionSurfacingMode::Light | AssumptionSurfacingMode::Explicit => {
            Some("Assumption: Proceeding with limited context only.")
        }
    }
}

fn render_confidence_line(plan: &OutputPlan) -> Option<&'static str> {
    match plan.confidence_signaling {
        ConfidenceSignalingLevel::Explicit => Some("Confidence: Cautious."),
        ConfidenceSignalingLevel::Guarded => Some("Confidence: Guarded."),
        ConfidenceSignalingLevel::Hedged => None,
    }
}

/// Append the unknown/assumption/confidence disclosure lines this
/// `OutputPlan` requires, bounded by the plan's verbosity cap.
pub fn annotate_disclosures(plan: &OutputPlan, state: &DecisionState, base_text: &str) -> String {
    let mut lines = vec![base_text.to_string()];
    lines.extend(render_unknown_line(plan, state).map(str::to_string));
    lines.extend(render_assumption_line(plan).map(str::to_string));
    lines.extend(render_confidence_line(plan).map(str::to_string));
    cap_length(&lines.join(" "), plan.verbosity_cap.char_limit())
}

/// Deterministically render fallback content for `output_plan` with no
/// model call involved.
pub fn render_fallback_content(decision_state: &DecisionState, output_plan: &OutputPlan) -> Result<FallbackContent, FallbackError> {
    match output_plan.action {
        OutputAction::Answer => Ok(FallbackContent { text: Some(render_answer(output_plan)), json: None }),
        OutputAction::AskOneQuestion => Ok(FallbackContent { text: None, json: Some(render_question(output_plan)?) }),
        OutputAction::Refuse => Ok(FallbackContent { text: Some(render_refusal(output_plan)?), json: None }),
        OutputAction::Close => Ok(FallbackContent { text: Some(render_close(output_plan)?), json: None }),
    }
    .map(|mut content| {
        if let Some(text) = &content.text {
            if output_plan.action == OutputAction::Answer {
                content.text = Some(annotate_disclosures(output_plan, decision_state, text));
            }
        }
        content
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output_plan::{ClosureSpec, QuestionSpec};
    use crate::domain::types::{ConfidenceSignalingLevel, ExpressionPosture, QuestionClass, RigorDisclosureLevel, VerbosityCap};

    fn minimal_state() -> DecisionState {
        use crate::domain::decision_state::RiskAssessment;
        use crate::domain::types::{ConfidenceLevel, OutcomeClass, RiskDomain};
        use std::collections::BTreeSet;

        DecisionState::new(
            "dec-1",
            "trace-1",
            crate::domain::types::ProximityState::Medium,
            false,
            vec![RiskAssessment { domain: RiskDomain::Financial, confidence: ConfidenceLevel::Medium }],
            crate::domain::types::ReversibilityClass::Reversible,
            crate::domain::types::ConsequenceHorizon::ShortHorizon,
            crate::domain::types::ResponsibilityScope::SelfOnly,
            vec![OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .expect("valid decision state")
    }

    fn plan(action: OutputAction) -> OutputPlan {
        OutputPlan {
            id: uuid::Uuid::nil(),
            action,
            posture: ExpressionPosture::Baseline,
            rigor_disclosure: RigorDisclosureLevel::Light,
            confidence_signaling: ConfidenceSignalingLevel::Guarded,
            assumption_surfacing: AssumptionSurfacingMode::Light,
            unknown_disclosure: UnknownDisclosureMode::None,
            verbosity_cap: VerbosityCap::Terse,
            question_spec: (action == OutputAction::AskOneQuestion).then(|| QuestionSpec {
                question_class: QuestionClass::FallbackInformational,
                priority_reason: "x".into(),
            }),
            refusal_spec: None,
            closure_spec: (action == OutputAction::Close)
                .then(|| ClosureSpec { rendering_mode: ClosureRenderingMode::ConfirmClosure }),
        }
    }

    #[test]
    fn close_without_spec_errors() {
        let mut p = plan(OutputAction::Close);
        p.closure_spec = None;
        let result = render_fallback_content(&minimal_state(), &p);
        assert_eq!(result.unwrap_err(), FallbackError::MissingClosureSpec);
    }

    #[test]
    fn question_has_exactly_one_question_mark() {
        let content = render_fallback_content(&minimal_state(), &plan(OutputAction::AskOneQuestion)).unwrap();
        let json = content.json.unwrap();
        let question = json["question"].as_str().unwrap();
        assert_eq!(question.matches('?').count(), 1);
    }

    #[test]
    fn answer_is_capped_to_verbosity() {
        let content = render_fallback_content(&minimal_state(), &plan(OutputAction::Answer)).unwrap();
        let text = content.text.unwrap();
        assert!(text.chars().count() <= VerbosityCap::Terse.char_limit());
    }
}
