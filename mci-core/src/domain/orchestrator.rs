//! ControlPlan assembly: the ten-step fixed orchestrator pipeline.
//!
//! Step structure mirrors `examples/rand-loop/rlm-core/src/orchestrator.rs`'s
//! `FallbackLoop` (one struct method per stage, `#[instrument]` on the
//! top-level entry point); the individual rule ladders are grounded on the
//! `orchestration_*.py` reference modules. Steps 2 (friction) and 6 (closure)
//! have no retrieved source file and are authored from the sibling modules'
//! established lattice pattern plus the component design prose — see
//! DESIGN.md.

use thiserror::Error;
use tracing::instrument;

use super::control_plan::{ControlPlan, ControlPlanError};
use super::decision_state::DecisionState;
use super::types::{
    ClarificationReason, ClosureState, ConfidenceLevel, ControlAction, FrictionPosture,
    InitiativeBudget, ProximityState, QuestionClass, RefusalCategory, ResponsibilityScope,
    ReversibilityClass, RigorLevel,
};

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    ControlPlan(#[from] ControlPlanError),
}

/// Raw signals about the ongoing turn that are not already captured in
/// `DecisionState` but are needed to detect closure (step 6). Kept separate
/// from `DecisionState` because closure detection reads the current turn's
/// text directly, per the ordered-keyword-ladder idiom used throughout this
/// pipeline, rather than a pre-classified enum.
#[derive(Debug, Clone, Default)]
pub struct TurnSignals {
    pub raw_text: String,
    pub already_closing: bool,
}

const TERMINATION_MARKERS: &[&str] = &["never mind", "forget it", "stop", "that's all", "i'm done"];
const WRAP_UP_MARKERS: &[&str] = &["thanks, that's everything", "ok thanks", "got it, thanks", "that answers it"];

fn detect_closure(signals: &TurnSignals) -> ClosureState {
    let lower = signals.raw_text.to_lowercase();
    if TERMINATION_MARKERS.iter().any(|m| lower.contains(m)) {
        ClosureState::UserTerminated
    } else if WRAP_UP_MARKERS.iter().any(|m| lower.contains(m)) {
        ClosureState::Closing
    } else if signals.already_closing {
        ClosureState::Closed
    } else {
        ClosureState::Open
    }
}

/// Step 1: rigor selection. Bump-only lattice, never demotes.
fn select_rigor(state: &DecisionState) -> RigorLevel {
    let mut level = RigorLevel::Minimal;

    if state.has_critical_domain_at_or_above(ConfidenceLevel::Medium) {
        level = level.max(RigorLevel::Guarded);
    }
    if state.reversibility_class == ReversibilityClass::Irreversible {
        level = level.max(RigorLevel::Structured);
    }
    if state.proximity_state == ProximityState::High || state.proximity_state == ProximityState::Imminent {
        level = level.max(RigorLevel::Structured);
    }
    if state.responsibility_scope == ResponsibilityScope::SystemicPublic {
        level = level.max(RigorLevel::Structured);
    }
    if state.proximity_state == ProximityState::Imminent
        && state.has_critical_domain_at_or_above(ConfidenceLevel::Medium)
    {
        level = level.max(RigorLevel::Enforced);
    }
    if !state.explicit_unknown_zone.is_empty()
        && (state.proximity_state == ProximityState::High || state.proximity_state == ProximityState::Imminent)
    {
        level = level.max(RigorLevel::Enforced);
    }

    level
}

/// Step 2: friction posture. Bump-only lattice driven by rigor + stakes.
fn select_friction(state: &DecisionState, rigor: RigorLevel) -> FrictionPosture {
    let mut posture = FrictionPosture::None;

    if state.has_critical_domain_at_or_above(ConfidenceLevel::Medium) {
        posture = posture.max(FrictionPosture::SoftPause);
    }
    if rigor == RigorLevel::Structured
        && (state.proximity_state == ProximityState::High || state.proximity_state == ProximityState::Imminent)
    {
        posture = posture.max(FrictionPosture::HardPause);
    }
    if rigor == RigorLevel::Enforced
        && (state.proximity_state == ProximityState::Imminent
            || state.reversibility_class == ReversibilityClass::Irreversible)
    {
        posture = posture.max(FrictionPosture::Stop);
    }

    posture
}

/// Step 3: clarification trigger, tiered by proximity.
fn decide_clarification(state: &DecisionState) -> (bool, ClarificationReason) {
    let critical_medium = state.has_critical_domain_at_or_above(ConfidenceLevel::Medium);
    let critical_low = state.has_critical_domain_at_or_above(ConfidenceLevel::Low);
    let irreversible_with_unknowns =
        state.reversibility_class == ReversibilityClass::Irreversible && !state.explicit_unknown_zone.is_empty();

    match state.proximity_state {
        ProximityState::High | ProximityState::Imminent => {
            if irreversible_with_unknowns {
                (true, ClarificationReason::IrreversibleWithUnknowns)
            } else if !state.explicit_unknown_zone.is_empty() {
                (true, ClarificationReason::HighProximityUnknowns)
            } else {
                (false, ClarificationReason::None)
            }
        }
        ProximityState::Medium => {
            if critical_medium {
                (true, ClarificationReason::CriticalDomainMediumConfidence)
            } else {
                (false, ClarificationReason::None)
            }
        }
        ProximityState::Low | ProximityState::VeryLow | ProximityState::Unknown => {
            if critical_low {
                (true, ClarificationReason::CriticalDomainLowConfidence)
            } else {
                (false, ClarificationReason::None)
            }
        }
    }
}

/// Step 4: question compression, priority-ordered.
fn select_question_class(state: &DecisionState, clarification_reason: ClarificationReason) -> QuestionClass {
    if state.has_critical_domain_at_or_above(ConfidenceLevel::Low) {
        QuestionClass::SafetyLegal
    } else if state.reversibility_class == ReversibilityClass::Irreversible {
        QuestionClass::Irreversibility
    } else if state.responsibility_scope != ResponsibilityScope::SelfOnly {
        QuestionClass::Responsibility
    } else if matches!(
        clarification_reason,
        ClarificationReason::HighProximityUnknowns | ClarificationReason::IrreversibleWithUnknowns
    ) {
        QuestionClass::ConstraintGap
    } else if !state.explicit_unknown_zone.is_empty() {
        QuestionClass::IntentAmbiguity
    } else {
        QuestionClass::FallbackInformational
    }
}

/// Step 5: initiative & warning budget.
fn select_initiative(state: &DecisionState, clarification_required: bool) -> (InitiativeBudget, u8) {
    if clarification_required {
        return (InitiativeBudget::Once, 0);
    }
    let initiative = match state.proximity_state {
        ProximityState::Imminent | ProximityState::High => InitiativeBudget::StrictOnce,
        ProximityState::Medium => InitiativeBudget::Once,
        _ => InitiativeBudget::None,
    };
    (initiative, 1)
}

/// Step 7: refusal decision, tiered.
fn decide_refusal(state: &DecisionState, closure: ClosureState) -> (bool, RefusalCategory) {
    if closure == ClosureState::UserTerminated {
        return (false, RefusalCategory::None);
    }

    let critical_imminent_unknown = state.has_critical_domain_at_or_above(ConfidenceLevel::High)
        && state.proximity_state == ProximityState::Imminent
        && !state.explicit_unknown_zone.is_empty();
    if critical_imminent_unknown {
        return (true, RefusalCategory::RiskRefusal);
    }

    let irreversible_imminent_unknown = state.reversibility_class == ReversibilityClass::Irreversible
        && state.proximity_state == ProximityState::Imminent
        && !state.explicit_unknown_zone.is_empty();
    if irreversible_imminent_unknown {
        return (true, RefusalCategory::RiskRefusal);
    }

    let systemic_unknown = state.responsibility_scope == ResponsibilityScope::SystemicPublic
        && (state.proximity_state == ProximityState::Medium
            || state.proximity_state == ProximityState::High
            || state.proximity_state == ProximityState::Imminent)
        && !state.explicit_unknown_zone.is_empty();
    if systemic_unknown {
        return (true, RefusalCategory::RiskRefusal);
    }

    (false, RefusalCategory::None)
}

/// Assemble a ControlPlan from a DecisionState and this turn's raw signals.
#[instrument(skip(state, signals), fields(decision_id = %state.decision_id))]
pub fn assemble_control_plan(
    state: &DecisionState,
    signals: &TurnSignals,
) -> Result<ControlPlan, OrchestrationError> {
    let rigor_level = select_rigor(state);
    let mut friction_posture = select_friction(state, rigor_level);

    let (mut clarification_required, clarification_reason) = decide_clarification(state);
    let question_class = if clarification_required {
        Some(select_question_class(state, clarification_reason))
    } else {
        None
    };

    let (mut initiative_budget, mut warning_budget) = select_initiative(state, clarification_required);

    let closure_state = detect_closure(signals);
    if closure_state != ClosureState::Open {
        clarification_required = false;
        initiative_budget = InitiativeBudget::None;
        warning_budget = 0;
    }

    let (refusal_required, refusal_category) = decide_refusal(state, closure_state);
    if refusal_required {
        clarification_required = false;
    }

    if friction_posture == FrictionPosture::Stop
        && !(refusal_required || closure_state != ClosureState::Open || clarification_required)
    {
        friction_posture = FrictionPosture::HardPause;
    }

    let question_budget = if clarification_required { 1 } else { 0 };
    let question_class = if clarification_required { question_class } else { None };

    let action = if closure_state != ClosureState::Open {
        ControlAction::Close
    } else if refusal_required {
        ControlAction::Refuse
    } else if clarification_required {
        ControlAction::AskOneQuestion
    } else {
        ControlAction::AnswerAllowed
    };

    let plan = ControlPlan {
        action,
        rigor_level,
        friction_posture,
        clarification_required,
        clarification_reason,
        question_budget,
        question_class,
        initiative_budget,
        warning_budget,
        closure_state,
        refusal_required,
        refusal_category,
    };

    Ok(plan.validate()?)
}


#[cfg(test)]
impl super::types::ConsequenceHorizon {
    fn immediate_default() -> Self {
        super::types::ConsequenceHorizon::Immediate
    }
}
