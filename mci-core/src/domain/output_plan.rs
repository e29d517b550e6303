//! OutputPlan: the expression-layer selectors, run after the ControlPlan.
//!
//! Selector order and bump-only lattice grounded on
//! `examples/original_source/backend/mci_backend/output_plan.py`.

use thiserror::Error;
use uuid::Uuid;

use super::control_plan::ControlPlan;
use super::decision_state::DecisionState;
use super::types::{
    AssumptionSurfacingMode, ClosureRenderingMode, ConfidenceSignalingLevel, ControlAction,
    FrictionPosture, OutputAction, QuestionClass, RefusalCategory, RefusalExplanationMode,
    RigorDisclosureLevel, UnknownDisclosureMode, VerbosityCap, ExpressionPosture,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputAssemblyError {
    #[error("CLOSE forbids question_spec and refusal_spec")]
    CloseForbidsQuestionOrRefusal,
    #[error("REFUSE requires a non-NONE refusal category and CONSTRAINED posture")]
    RefuseRequiresCategoryAndConstrainedPosture,
    #[error("ASK_ONE_QUESTION forbids ENFORCED rigor_disclosure and DETAILED verbosity")]
    AskForbidsEnforcedOrDetailed,
    #[error("ANSWER forbids STOP friction")]
    AnswerForbidsStopFriction,
    #[error("ENFORCED rigor_disclosure forbids NONE unknown_disclosure")]
    EnforcedRigorForbidsNoneUnknownDisclosure,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuestionSpec {
    pub question_class: QuestionClass,
    pub priority_reason: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefusalSpec {
    pub category: RefusalCategory,
    pub explanation_mode: RefusalExplanationMode,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClosureSpec {
    pub rendering_mode: ClosureRenderingMode,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputPlan {
    pub id: Uuid,
    pub action: OutputAction,
    pub posture: ExpressionPosture,
    pub rigor_disclosure: RigorDisclosureLevel,
    pub confidence_signaling: ConfidenceSignalingLevel,
    pub assumption_surfacing: AssumptionSurfacingMode,
    pub unknown_disclosure: UnknownDisclosureMode,
    pub verbosity_cap: VerbosityCap,
    pub question_spec: Option<QuestionSpec>,
    pub refusal_spec: Option<RefusalSpec>,
    pub closure_spec: Option<ClosureSpec>,
}

fn map_action(control: &ControlPlan) -> OutputAction {
    match control.action {
        ControlAction::AnswerAllowed => OutputAction::Answer,
        ControlAction::AskOneQuestion => OutputAction::AskOneQuestion,
        ControlAction::Refuse => OutputAction::Refuse,
        ControlAction::Close => OutputAction::Close,
    }
}

fn select_posture(state: &DecisionState, control: &ControlPlan) -> ExpressionPosture {
    let mut posture = ExpressionPosture::Baseline;
    if control.friction_posture >= FrictionPosture::SoftPause {
        posture = posture.max(ExpressionPosture::Guarded);
    }
    if control.friction_posture == FrictionPosture::Stop || control.refusal_required {
        posture = posture.max(ExpressionPosture::Constrained);
    }
    if state.has_critical_domain_at_or_above(super::types::ConfidenceLevel::Medium) {
        posture = posture.max(ExpressionPosture::Guarded);
    }
    if state.reversibility_class == super::types::ReversibilityClass::Irreversible {
        posture = posture.max(ExpressionPosture::Constrained);
    }
    posture
}

fn select_rigor_disclosure(control: &ControlPlan) -> RigorDisclosureLevel {
    match control.rigor_level {
        super::types::RigorLevel::Minimal => RigorDisclosureLevel::None,
        super::types::RigorLevel::Guarded => RigorDisclosureLevel::Light,
        super::types::RigorLevel::Structured => RigorDisclosureLevel::Standard,
        super::types::RigorLevel::Enforced => RigorDisclosureLevel::Enforced,
    }
}

fn select_confidence_signaling(state: &DecisionState, posture: ExpressionPosture) -> ConfidenceSignalingLevel {
    if posture == ExpressionPosture::Constrained {
        ConfidenceSignalingLevel::Hedged
    } else if !state.explicit_unknown_zone.is_empty() {
        ConfidenceSignalingLevel::Guarded
    } else {
        ConfidenceSignalingLevel::Explicit
    }
}

fn select_unknown_disclosure(state: &DecisionState) -> UnknownDisclosureMode {
    if state.explicit_unknown_zone.is_empty() {
        UnknownDisclosureMode::None
    } else if state.proximity_state == super::types::ProximityState::High
        || state.proximity_state == super::types::ProximityState::Imminent
    {
        UnknownDisclosureMode::Full
    } else {
        UnknownDisclosureMode::Light
    }
}

fn select_assumption_surfacing(state: &DecisionState) -> AssumptionSurfacingMode {
    if state.proximity_uncertainty {
        AssumptionSurfacingMode::Explicit
    } else if !state.explicit_unknown_zone.is_empty() {
        AssumptionSurfacingMode::Light
    } else {
        AssumptionSurfacingMode::None
    }
}

fn select_verbosity_cap(control: &ControlPlan) -> VerbosityCap {
    match control.action {
        ControlAction::Close => VerbosityCap::Terse,
        ControlAction::AskOneQuestion => VerbosityCap::Normal,
        ControlAction::Refuse => VerbosityCap::Normal,
        ControlAction::AnswerAllowed => VerbosityCap::Detailed,
    }
}

fn deterministic_output_plan_id(
    trace_id: &str,
    decision_state_id: &str,
    control_plan_id: &str,
    action: OutputAction,
) -> Uuid {
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x6f, 0x75, 0x74, 0x70, 0x75, 0x74, 0x2d, 0x70, 0x6c, 0x61, 0x6e, 0x2d, 0x6e, 0x73, 0x00, 0x01,
    ]);
    let material = format!(
        "{trace_id}|{decision_state_id}|{control_plan_id}|{action:?}|{}",
        super::decision_state::SCHEMA_VERSION
    );
    Uuid::new_v5(&NAMESPACE, material.as_bytes())
}

/// Run all eight selectors and assemble the final OutputPlan.
pub fn assemble_output_plan(
    state: &DecisionState,
    control: &ControlPlan,
) -> Result<OutputPlan, OutputAssemblyError> {
    let action = map_action(control);
    let posture = select_posture(state, control);
    let rigor_disclosure = select_rigor_disclosure(control);
    let confidence_signaling = select_confidence_signaling(state, posture);
    let unknown_disclosure = select_unknown_disclosure(state);
    let assumption_surfacing = select_assumption_surfacing(state);
    let verbosity_cap = select_verbosity_cap(control);

    let refusal_spec = if control.refusal_required {
        Some(RefusalSpec {
            category: control.refusal_category,
            explanation_mode: if posture == ExpressionPosture::Constrained {
                RefusalExplanationMode::Brief
            } else {
                RefusalExplanationMode::Detailed
            },
        })
    } else {
        None
    };

    let question_spec = if control.question_budget == 1 {
        control.question_class.map(|qc| QuestionSpec {
            question_class: qc,
            priority_reason: format!("{:?}", control.clarification_reason),
        })
    } else {
        None
    };

    let closure_spec = if control.closure_state != super::types::ClosureState::Open {
        Some(ClosureSpec {
            rendering_mode: match control.closure_state {
                super::types::ClosureState::UserTerminated => ClosureRenderingMode::Silence,
                super::types::ClosureState::Closing => ClosureRenderingMode::ConfirmClosure,
                super::types::ClosureState::Closed => ClosureRenderingMode::BriefSummaryAndStop,
                super::types::ClosureState::Open => unreachable!(),
            },
        })
    } else {
        None
    };

    if action == OutputAction::Close && (question_spec.is_some() || refusal_spec.is_some()) {
        return Err(OutputAssemblyError::CloseForbidsQuestionOrRefusal);
    }
    if action == OutputAction::Refuse
        && (refusal_spec.is_none()
            || control.refusal_category == RefusalCategory::None
            || posture != ExpressionPosture::Constrained)
    {
        return Err(OutputAssemblyError::RefuseRequiresCategoryAndConstrainedPosture);
    }
    if action == OutputAction::AskOneQuestion
        && (rigor_disclosure == RigorDisclosureLevel::Enforced || verbosity_cap == VerbosityCap::Detailed)
    {
        return Err(OutputAssemblyError::AskForbidsEnforcedOrDetailed);
    }
    if action == OutputAction::Answer && control.friction_posture == FrictionPosture::Stop {
        return Err(OutputAssemblyError::AnswerForbidsStopFriction);
    }
    if rigor_disclosure == RigorDisclosureLevel::Enforced && unknown_disclosure == UnknownDisclosureMode::None {
        return Err(OutputAssemblyError::EnforcedRigorForbidsNoneUnknownDisclosure);
    }

    let id =
        deterministic_output_plan_id(&state.trace_id, &state.decision_id, &control.content_fingerprint(), action);

    Ok(OutputPlan {
        id,
        action,
        posture,
        rigor_disclosure,
        confidence_signaling,
        assumption_surfacing,
        unknown_disclosure,
        verbosity_cap,
        question_spec,
        refusal_spec,
        closure_spec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision_state::RiskAssessment;
    use crate::domain::types::{ConfidenceLevel, OutcomeClass, ProximityState, ResponsibilityScope, ReversibilityClass, RiskDomain};
    use std::collections::BTreeSet;

    fn answer_control_plan() -> ControlPlan {
        ControlPlan {
            action: ControlAction::AnswerAllowed,
            rigor_level: super::super::types::RigorLevel::Minimal,
            friction_posture: FrictionPosture::None,
            clarification_required: false,
            clarification_reason: super::super::types::ClarificationReason::None,
            question_budget: 0,
            question_class: None,
            initiative_budget: super::super::types::InitiativeBudget::None,
            warning_budget: 1,
            closure_state: super::super::types::ClosureState::Open,
            refusal_required: false,
            refusal_category: RefusalCategory::None,
        }
    }

    fn low_stakes_state() -> DecisionState {
        DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::VeryLow,
            true,
            vec![RiskAssessment { domain: RiskDomain::Financial, confidence: ConfidenceLevel::Low }],
            ReversibilityClass::Reversible,
            super::super::types::ConsequenceHorizon::Immediate,
            ResponsibilityScope::SelfOnly,
            vec![OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .unwrap()
    }

    #[test]
    fn answer_plan_assembles() {
        let plan = assemble_output_plan(&low_stakes_state(), &answer_control_plan()).unwrap();
        assert_eq!(plan.action, OutputAction::Answer);
        assert_eq!(plan.verbosity_cap, VerbosityCap::Detailed);
    }

    #[test]
    fn output_plan_id_is_deterministic() {
        let a = assemble_output_plan(&low_stakes_state(), &answer_control_plan()).unwrap();
        let b = assemble_output_plan(&low_stakes_state(), &answer_control_plan()).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn output_plan_id_differs_across_distinct_control_plans() {
        let mut other_control = answer_control_plan();
        other_control.warning_budget = 0;
        let a = assemble_output_plan(&low_stakes_state(), &answer_control_plan()).unwrap();
        let b = assemble_output_plan(&low_stakes_state(), &other_control).unwrap();
        assert_eq!(a.action, b.action);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn answer_forbids_stop_friction() {
        let mut control = answer_control_plan();
        control.friction_posture = FrictionPosture::Stop;
        control.refusal_required = true;
        control.refusal_category = RefusalCategory::RiskRefusal;
        control.action = ControlAction::AnswerAllowed;
        let err = assemble_output_plan(&low_stakes_state(), &control).unwrap_err();
        assert_eq!(err, OutputAssemblyError::AnswerForbidsStopFriction);
    }
}
