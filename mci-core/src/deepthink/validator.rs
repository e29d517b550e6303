//! DecisionDelta validator: 2-strikes rule.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/validator.py`.

use crate::domain::types::StopReason;

use super::decision::{is_allowed_path, is_forbidden_path, path_spec, DecisionDelta, PatchValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<String>,
    pub strikes_added: u8,
    pub total_strikes: u8,
    pub stop_reason: Option<StopReason>,
    pub downgrade: bool,
}

fn validate_op_value(path: &str, value: &PatchValue, errors: &mut Vec<String>) {
    let kind_ok = match (path, value) {
        ("decision.action", PatchValue::Action(_)) => true,
        ("decision.answer" | "decision.rationale" | "decision.clarify_question", PatchValue::Text(_)) => true,
        ("decision.alternatives", PatchValue::StringList(_)) => true,
        _ => false,
    };
    if !kind_ok {
        errors.push(format!("value type mismatch for path '{path}'"));
        return;
    }

    let Some(spec) = path_spec(path) else {
        return;
    };

    match value {
        PatchValue::Text(text) => {
            if let Some(max_len) = spec.max_length {
                if text.chars().count() > max_len {
                    errors.push(format!(
                        "value length {} exceeds max {max_len} for path '{path}'",
                        text.chars().count()
                    ));
                }
            }
        }
        PatchValue::StringList(items) => {
            if let Some(max_items) = spec.max_items {
                if items.len() > max_items {
                    errors.push(format!("list length {} exceeds max {max_items} for path '{path}'", items.len()));
                }
            }
            if let Some(max_item_length) = spec.max_item_length {
                for (idx, item) in items.iter().enumerate() {
                    if item.chars().count() > max_item_length {
                        errors.push(format!(
                            "list item [{idx}] length {} exceeds max {max_item_length} for path '{path}'",
                            item.chars().count()
                        ));
                    }
                }
            }
        }
        PatchValue::Action(_) => {}
    }
}

/// Validate a `DecisionDelta` against the fixed rule set, applying the
/// 2-strikes policy against `current_strikes`.
pub fn validate_delta(delta: &DecisionDelta, current_strikes: u8) -> ValidationResult {
    let mut errors = Vec::new();

    for (i, op) in delta.iter().enumerate() {
        if !is_allowed_path(&op.path) {
            errors.push(format!("delta[{i}]: path '{}' is not in allowlist", op.path));
        }
        if is_forbidden_path(&op.path) {
            errors.push(format!("delta[{i}]: path '{}' matches forbidden pattern", op.path));
        }
        if is_allowed_path(&op.path) {
            let mut value_errors = Vec::new();
            validate_op_value(&op.path, &op.value, &mut value_errors);
            errors.extend(value_errors.into_iter().map(|e| format!("delta[{i}]: {e}")));
        }
    }

    let ok = errors.is_empty();
    let strikes_added = if ok { 0 } else { 1 };
    let total_strikes = current_strikes + strikes_added;

    let (stop_reason, downgrade) = if total_strikes >= 2 {
        (Some(StopReason::ValidationFail), true)
    } else {
        (None, false)
    };

    errors.sort();

    ValidationResult { ok, errors, strikes_added, total_strikes, stop_reason, downgrade }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepthink::decision::{DecisionAction, PatchOp};

    #[test]
    fn empty_delta_is_valid() {
        let result = validate_delta(&vec![], 0);
        assert!(result.ok);
        assert_eq!(result.strikes_added, 0);
    }

    #[test]
    fn forbidden_path_is_one_strike() {
        let delta = vec![PatchOp::set("decision.budget_hint", PatchValue::Text("x".into()))];
        let result = validate_delta(&delta, 0);
        assert!(!result.ok);
        assert_eq!(result.strikes_added, 1);
        assert_eq!(result.total_strikes, 1);
        assert!(result.stop_reason.is_none());
    }

    #[test]
    fn second_strike_triggers_validation_fail() {
        let delta = vec![PatchOp::set("decision.budget_hint", PatchValue::Text("x".into()))];
        let result = validate_delta(&delta, 1);
        assert_eq!(result.total_strikes, 2);
        assert_eq!(result.stop_reason, Some(StopReason::ValidationFail));
        assert!(result.downgrade);
    }

    #[test]
    fn oversized_answer_is_rejected() {
        let huge = "a".repeat(2000);
        let delta = vec![PatchOp::set("decision.answer", PatchValue::Text(huge))];
        let result = validate_delta(&delta, 0);
        assert!(!result.ok);
    }

    #[test]
    fn valid_action_patch_passes() {
        let delta = vec![PatchOp::set("decision.action", PatchValue::Action(DecisionAction::AskClarify))];
        let result = validate_delta(&delta, 0);
        assert!(result.ok);
    }

    #[test]
    fn errors_are_sorted() {
        let delta = vec![
            PatchOp::set("decision.zzz_forbidden_token", PatchValue::Text("a".into())),
            PatchOp::set("decision.aaa_forbidden_token", PatchValue::Text("b".into())),
        ];
        let result = validate_delta(&delta, 0);
        let mut sorted = result.errors.clone();
        sorted.sort();
        assert_eq!(result.errors, sorted);
    }
}
