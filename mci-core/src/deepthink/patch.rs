//! Patch applier: applies a validated `DecisionDelta` to a deep-copied
//! `Decision`. Operations execute in ascending path order regardless of the
//! order they were produced in.

use thiserror::Error;

use super::decision::{is_allowed_path, is_forbidden_path, Decision, DecisionDelta, PatchValue};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("path '{0}' is not in the allowlist")]
    PathNotAllowed(String),
    #[error("path '{0}' matches a forbidden pattern")]
    PathForbidden(String),
    #[error("value type mismatch for path '{0}'")]
    ValueTypeMismatch(String),
}

/// Apply `delta` to a clone of `decision`, leaving the original untouched.
/// Ops are sorted by path ascending before application, matching the patch
/// applier's documented order-independence.
pub fn apply_delta(decision: &Decision, delta: &DecisionDelta) -> Result<Decision, PatchError> {
    let mut next = decision.clone();
    let mut ops: Vec<&super::decision::PatchOp> = delta.iter().collect();
    ops.sort_by(|a, b| a.path.cmp(&b.path));

    for op in ops {
        if !is_allowed_path(&op.path) {
            return Err(PatchError::PathNotAllowed(op.path.clone()));
        }
        if is_forbidden_path(&op.path) {
            return Err(PatchError::PathForbidden(op.path.clone()));
        }
        match (op.path.as_str(), &op.value) {
            ("decision.action", PatchValue::Action(action)) => next.action = *action,
            ("decision.answer", PatchValue::Text(text)) => next.answer = text.clone(),
            ("decision.rationale", PatchValue::Text(text)) => next.rationale = text.clone(),
            ("decision.clarify_question", PatchValue::Text(text)) => next.clarify_question = text.clone(),
            ("decision.alternatives", PatchValue::StringList(items)) => next.alternatives = items.clone(),
            _ => return Err(PatchError::ValueTypeMismatch(op.path.clone())),
        }
    }

    Ok(next)
}
