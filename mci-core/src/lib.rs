//! # mci-core
//!
//! A deterministic, non-agentic governed-response decision pipeline: every
//! chat turn is assembled through a fixed sequence of pure stages rather
//! than an open-ended agent loop.
//!
//! ## Pipeline stages
//!
//! - **DecisionState** ([`domain::decision_state`]): classifies stakes
//!   dimensions from raw request features.
//! - **ControlPlan** ([`domain::orchestrator`]): the fixed 10-step
//!   orchestration pipeline (rigor, friction, clarification, refusal,
//!   action resolution).
//! - **OutputPlan** ([`domain::output_plan`]): eight pure selectors mapping
//!   `DecisionState` + `ControlPlan` to an expression-layer plan.
//! - **Deep-think** ([`deepthink`]): an optional, budget-bounded multi-pass
//!   refinement stage operating through a patch-only DSL.
//! - **Model invocation** ([`model`]): envelope construction, bounded model
//!   call, verification, and deterministic fallback rendering.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mci_core::{assemble_decision_state, RawRequestFeatures};
//!
//! let features = RawRequestFeatures { text: "should I take this loan?".into() };
//! let state = assemble_decision_state("dec-1", "trace-1", &features, None)?;
//! # Ok::<(), mci_core::AssemblyError>(())
//! ```

pub mod config;
pub mod deepthink;
pub mod domain;
pub mod model;
pub mod session;
pub mod telemetry;

pub use config::{AppConfig, AppEnv, ConfigError};
pub use domain::{
    assemble_control_plan, assemble_decision_state, assemble_output_plan, AssemblyError, ControlPlan,
    ControlPlanError, DecisionState, OrchestrationError, OutputAssemblyError, OutputPlan, RawRequestFeatures,
    RiskAssessment, TurnSignals,
};
pub use model::{
    build_model_invocation_request, invoke_model_for_output_plan, render_fallback_content,
    verify_and_sanitize_model_output, HttpModelClient, ModelClient, ModelClientConfig, ModelInvocationRequest,
    ModelInvocationResult, ModelOutputFormat,
};
pub use session::{session_key, InMemorySessionStore, SessionStore};
