//! Stages 1-3 of the governed-response pipeline: DecisionState assembly,
//! ControlPlan orchestration, and OutputPlan selection.

pub mod control_plan;
pub mod decision_state;
pub mod orchestrator;
pub mod output_plan;
pub mod types;

pub use control_plan::{ControlPlan, ControlPlanError};
pub use decision_state::{
    assemble_decision_state, classify_consequence_horizon, classify_outcome_classes, classify_proximity,
    classify_responsibility_scope, classify_reversibility, classify_risk_domains, AssemblyError, DecisionState,
    RawRequestFeatures, RiskAssessment,
};
pub use orchestrator::{assemble_control_plan, OrchestrationError, TurnSignals};
pub use output_plan::{assemble_output_plan, OutputAssemblyError, OutputPlan};
