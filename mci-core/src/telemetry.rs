//! Privacy-preserving structural telemetry: a decision signature over
//! structural metadata only, and a safe `chat.summary` event builder.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/telemetry.py`.
//! No user text, model output, or free-form field ever enters either output.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::deepthink::decision::{DecisionDelta, PatchValue};
use crate::domain::types::{EntitlementTier, PassType, StopReason};

/// Keys that must never appear in a telemetry payload because they may
/// carry user or assistant text.
pub const FORBIDDEN_TEXT_KEYS: &[&str] = &[
    "user_text",
    "prompt",
    "message",
    "content",
    "rendered_text",
    "answer",
    "rationale",
    "clarify_question",
    "alternatives",
    "request_text",
    "user_input",
    "assistant_output",
];

#[derive(Debug, Clone, Default)]
pub struct StableInputs {
    pub entitlement_tier: Option<EntitlementTier>,
    pub deepthink_enabled: Option<bool>,
    pub breaker_tripped: Option<bool>,
    pub abuse_blocked: Option<bool>,
    pub total_budget_units: Option<u64>,
    pub total_timeout_ms: Option<u64>,
    pub requested_mode: Option<String>,
}

fn sanitize_stable_inputs(inputs: &StableInputs) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(tier) = inputs.entitlement_tier {
        map.insert("entitlement_tier".into(), json!(format!("{tier:?}")));
    }
    if let Some(v) = inputs.deepthink_enabled {
        map.insert("deepthink_enabled".into(), json!(v));
    }
    if let Some(v) = inputs.breaker_tripped {
        map.insert("breaker_tripped".into(), json!(v));
    }
    if let Some(v) = inputs.abuse_blocked {
        map.insert("abuse_blocked".into(), json!(v));
    }
    if let Some(v) = inputs.total_budget_units {
        map.insert("total_budget_units".into(), json!(v));
    }
    if let Some(v) = inputs.total_timeout_ms {
        map.insert("total_timeout_ms".into(), json!(v));
    }
    if let Some(mode) = &inputs.requested_mode {
        if mode.chars().count() < 50 {
            map.insert("requested_mode".into(), json!(mode));
        }
    }
    map
}

fn encode_value_metadata(value: &PatchValue) -> Value {
    match value {
        PatchValue::Action(action) => json!({"type": "enum", "value": format!("{action:?}")}),
        PatchValue::Text(text) => json!({"type": "str", "len": text.chars().count()}),
        PatchValue::StringList(items) => {
            let lens: Vec<usize> = items.iter().take(3).map(|s| s.chars().count()).collect();
            json!({"type": "list_str", "count": items.len(), "lens": lens})
        }
    }
}

fn encode_deltas_structure(deltas: &[DecisionDelta]) -> Value {
    let mut encoded = Vec::new();
    for delta in deltas {
        for op in delta {
            encoded.push(json!({
                "op": "set",
                "path": op.path,
                "value_meta": encode_value_metadata(&op.value),
            }));
        }
    }
    Value::Array(encoded)
}

/// Compute a deterministic SHA-256 decision signature over structural
/// metadata only: stable inputs, the pass plan, per-op structure (never
/// content), and validator/stop-reason outcome.
pub fn compute_decision_signature(
    stable_inputs: &StableInputs,
    pass_plan: &[PassType],
    applied_deltas: &[DecisionDelta],
    validator_failures: u8,
    stop_reason: StopReason,
) -> String {
    let mut sig_data = Map::new();
    sig_data.insert("stable_inputs".into(), Value::Object(sanitize_stable_inputs(stable_inputs)));
    sig_data.insert(
        "pass_plan".into(),
        json!(pass_plan.iter().map(|p| format!("{p:?}")).collect::<Vec<_>>()),
    );
    sig_data.insert("deltas_structure".into(), encode_deltas_structure(applied_deltas));
    sig_data.insert("validator_failures".into(), json!(validator_failures));
    sig_data.insert("stop_reason".into(), json!(format!("{stop_reason:?}")));

    let canonical = serde_json::to_string(&Value::Object(sig_data)).expect("telemetry payload is always serializable");
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

#[derive(Debug, Clone)]
pub struct PassSummary {
    pub pass_type: PassType,
    pub executed: bool,
    pub validation_ok: bool,
    pub patch_applied: bool,
    pub cost_units: u32,
    pub duration_ms: u32,
    pub strikes_added: u8,
}

/// Build the safe `chat.summary` telemetry event. Contains no user or
/// assistant text, only structural/numeric fields.
pub fn build_chat_summary_event(
    pass_count: usize,
    stop_reason: StopReason,
    validator_failures: u8,
    downgraded: bool,
    decision_signature: &str,
    pass_summaries: &[PassSummary],
) -> Value {
    let summaries: Vec<Value> = pass_summaries
        .iter()
        .map(|s| {
            json!({
                "pass_type": format!("{:?}", s.pass_type),
                "executed": s.executed,
                "validation_ok": s.validation_ok,
                "patch_applied": s.patch_applied,
                "cost_units": s.cost_units,
                "duration_ms": s.duration_ms,
                "strikes_added": s.strikes_added,
            })
        })
        .collect();

    json!({
        "pass_count": pass_count,
        "stop_reason": format!("{stop_reason:?}"),
        "validator_failures": validator_failures,
        "downgraded": downgraded,
        "decision_signature": decision_signature,
        "pass_summaries": summaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let inputs = StableInputs { entitlement_tier: Some(EntitlementTier::Pro), ..Default::default() };
        let a = compute_decision_signature(&inputs, &[PassType::Refine], &[], 0, StopReason::SuccessCompleted);
        let b = compute_decision_signature(&inputs, &[PassType::Refine], &[], 0, StopReason::SuccessCompleted);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_stop_reasons_diverge() {
        let inputs = StableInputs::default();
        let a = compute_decision_signature(&inputs, &[], &[], 0, StopReason::SuccessCompleted);
        let b = compute_decision_signature(&inputs, &[], &[], 0, StopReason::ValidationFail);
        assert_ne!(a, b);
    }

    #[test]
    fn chat_summary_event_never_contains_forbidden_keys() {
        let event = build_chat_summary_event(1, StopReason::SuccessCompleted, 0, false, "abc", &[]);
        let serialized = event.to_string();
        for key in FORBIDDEN_TEXT_KEYS {
            assert!(!serialized.contains(&format!("\"{key}\"")));
        }
    }
}
