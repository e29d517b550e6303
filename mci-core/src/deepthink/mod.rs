//! Deep-think: the optional, budget-bounded multi-pass refinement stage
//! between `OutputPlan` and model invocation.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/`.

pub mod decision;
pub mod engine;
pub mod passes;
pub mod patch;
pub mod router;
pub mod validator;

pub use decision::{Decision, DecisionAction, DecisionDelta, PatchOp, PatchValue};
pub use engine::{run_engine, EngineContext, EngineOutput};
pub use passes::{run_pass, PassContext, PassRunResult};
pub use patch::{apply_delta, PatchError};
pub use router::{route, Plan, RouterInput, RouterPolicy};
pub use validator::{validate_delta, ValidationResult};
