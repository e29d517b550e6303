//! ControlPlan: output of the orchestrator, validated at construction.

use sha2::Digest;
use thiserror::Error;

use super::types::{
    ClarificationReason, ClosureState, ControlAction, FrictionPosture, InitiativeBudget,
    QuestionClass, RefusalCategory, RigorLevel,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlPlanError {
    #[error("STOP friction posture requires an active gate (refusal, closure, or clarification)")]
    StopWithoutActiveGate,
    #[error("clarification_required implies question_budget == 1 and vice versa")]
    ClarificationQuestionBudgetMismatch,
    #[error("refusal_required and refusal_category != NONE must agree")]
    RefusalCategoryMismatch,
    #[error("clarification_required requires warning_budget == 0")]
    ClarificationWarningBudgetNotZero,
    #[error("question_budget == 1 requires a question_class to be set")]
    QuestionBudgetWithoutClass,
    #[error("action resolution contradiction: {0}")]
    ActionResolutionContradiction(&'static str),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ControlPlan {
    pub action: ControlAction,
    pub rigor_level: RigorLevel,
    pub friction_posture: FrictionPosture,
    pub clarification_required: bool,
    pub clarification_reason: ClarificationReason,
    pub question_budget: u8,
    pub question_class: Option<QuestionClass>,
    pub initiative_budget: InitiativeBudget,
    pub warning_budget: u8,
    pub closure_state: ClosureState,
    pub refusal_required: bool,
    pub refusal_category: RefusalCategory,
}

impl ControlPlan {
    /// Validate cross-field invariants named in component design §4.2 step 10.
    /// Construction never happens except through the orchestrator, which
    /// calls this at the end of assembly.
    pub fn validate(self) -> Result<Self, ControlPlanError> {
        if self.friction_posture == FrictionPosture::Stop
            && !(self.refusal_required
                || self.closure_state != ClosureState::Open
                || self.clarification_required)
        {
            return Err(ControlPlanError::StopWithoutActiveGate);
        }

        if self.clarification_required != (self.question_budget == 1) {
            return Err(ControlPlanError::ClarificationQuestionBudgetMismatch);
        }

        if self.refusal_required != (self.refusal_category != RefusalCategory::None) {
            return Err(ControlPlanError::RefusalCategoryMismatch);
        }

        if self.clarification_required && self.warning_budget != 0 {
            return Err(ControlPlanError::ClarificationWarningBudgetNotZero);
        }

        if self.question_budget == 1 && self.question_class.is_none() {
            return Err(ControlPlanError::QuestionBudgetWithoutClass);
        }

        let expected_action = if self.closure_state != ClosureState::Open {
            ControlAction::Close
        } else if self.refusal_required {
            ControlAction::Refuse
        } else if self.clarification_required {
            ControlAction::AskOneQuestion
        } else {
            ControlAction::AnswerAllowed
        };

        if std::mem::discriminant(&self.action) != std::mem::discriminant(&expected_action) {
            return Err(ControlPlanError::ActionResolutionContradiction(
                "resolved action does not match CLOSE > REFUSE > ASK_ONE_QUESTION > ANSWER_ALLOWED priority",
            ));
        }

        Ok(self)
    }

    /// Deterministic fingerprint over every field, used as UUIDv5 material
    /// wherever a `ControlPlan` needs to be named without carrying its own
    /// id. Two plans with identical fields fingerprint identically; any
    /// field difference changes the digest.
    pub fn content_fingerprint(&self) -> String {
        let canonical =
            serde_json::to_string(self).expect("ControlPlan is always serializable");
        let digest = sha2::Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> ControlPlan {
        ControlPlan {
            action: ControlAction::AnswerAllowed,
            rigor_level: RigorLevel::Minimal,
            friction_posture: FrictionPosture::None,
            clarification_required: false,
            clarification_reason: ClarificationReason::None,
            question_budget: 0,
            question_class: None,
            initiative_budget: InitiativeBudget::None,
            warning_budget: 0,
            closure_state: ClosureState::Open,
            refusal_required: false,
            refusal_category: RefusalCategory::None,
        }
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive_to_field_changes() {
        let a = baseline();
        let b = baseline();
        assert_eq!(a.content_fingerprint(), b.content_fingerprint());

        let mut c = baseline();
        c.rigor_level = RigorLevel::Enforced;
        assert_ne!(a.content_fingerprint(), c.content_fingerprint());
    }

    #[test]
    fn baseline_validates() {
        assert!(baseline().validate().is_ok());
    }

    #[test]
    fn stop_without_gate_rejected() {
        let mut plan = baseline();
        plan.friction_posture = FrictionPosture::Stop;
        assert_eq!(plan.validate().unwrap_err(), ControlPlanError::StopWithoutActiveGate);
    }

    #[test]
    fn clarification_requires_question_budget() {
        let mut plan = baseline();
        plan.clarification_required = true;
        plan.question_class = Some(QuestionClass::IntentAmbiguity);
        plan.action = ControlAction::AskOneQuestion;
        assert_eq!(
            plan.validate().unwrap_err(),
            ControlPlanError::ClarificationQuestionBudgetMismatch
        );
    }

    #[test]
    fn action_resolution_priority_close_wins() {
        let mut plan = baseline();
        plan.closure_state = ClosureState::Closed;
        plan.action = ControlAction::Close;
        assert!(plan.validate().is_ok());
    }
}
