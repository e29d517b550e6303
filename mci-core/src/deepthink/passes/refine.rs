//! REFINE pass: mild tightening, no action changes.
//!
//! Per the resolved empty-answer question, REFINE may only widen an empty
//! `decision.answer` with a minimal bounded placeholder; it never otherwise
//! grows answer length.

use crate::deepthink::decision::{Decision, PatchOp, PatchValue};
use crate::domain::types::{PassType, MAX_RATIONALE_CHARS};

use super::{PassContext, PassRunResult};

const CAVEAT_KEYWORDS: &[&str] = &["assuming", "typically", "may vary", "depending"];
const PLACEHOLDER_ANSWER: &str = "A direct answer requires more context; see rationale for constraints.";

fn tighten_rationale(rationale: &str) -> String {
    if rationale.is_empty() {
        return rationale.to_string();
    }
    let lowered = rationale.to_ascii_lowercase();
    let has_caveat = CAVEAT_KEYWORDS.iter().any(|kw| lowered.contains(kw));
    let tightened = if has_caveat {
        rationale.to_string()
    } else {
        format!("{} This assumes typical conditions and may vary.", rationale.trim())
    };
    tightened.chars().take(MAX_RATIONALE_CHARS).collect()
}

pub fn run(decision: &Decision, ctx: &PassContext) -> PassRunResult {
    let mut ops = Vec::new();

    if decision.answer.is_empty() && decision.action == crate::deepthink::decision::DecisionAction::Answer {
        ops.push(PatchOp::set("decision.answer", PatchValue::Text(PLACEHOLDER_ANSWER.to_string())));
    }

    let tightened = tighten_rationale(&decision.rationale);
    if tightened != decision.rationale {
        ops.push(PatchOp::set("decision.rationale", PatchValue::Text(tightened)));
    }

    ops.sort_by(|a, b| a.path.cmp(&b.path));

    let text_len = decision.answer.len() + decision.rationale.len() + ctx.request_text.len();
    let cost_units = (20 + text_len / 60).min(100) as u32;
    let duration_ms = (80 + text_len / 20).min(400) as u32;

    PassRunResult { pass_type: PassType::Refine, delta: ops, cost_units, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepthink::decision::DecisionAction;

    #[test]
    fn fills_empty_answer_for_answer_action() {
        let decision = Decision { action: DecisionAction::Answer, ..Default::default() };
        let result = run(&decision, &PassContext::default());
        assert!(result.delta.iter().any(|op| op.path == "decision.answer"));
    }

    #[test]
    fn leaves_non_empty_answer_untouched() {
        let decision = Decision { action: DecisionAction::Answer, answer: "existing".into(), ..Default::default() };
        let result = run(&decision, &PassContext::default());
        assert!(!result.delta.iter().any(|op| op.path == "decision.answer"));
    }

    #[test]
    fn adds_caveat_to_rationale_once() {
        let decision = Decision { rationale: "Because X causes Y.".into(), ..Default::default() };
        let result = run(&decision, &PassContext::default());
        let op = result.delta.iter().find(|op| op.path == "decision.rationale").unwrap();
        if let PatchValue::Text(text) = &op.value {
            assert!(text.contains("assumes typical conditions"));
        } else {
            panic!("expected text value");
        }
    }

    #[test]
    fn does_not_duplicate_existing_caveat() {
        let decision = Decision { rationale: "Typically this holds.".into(), ..Default::default() };
        let result = run(&decision, &PassContext::default());
        assert!(!result.delta.iter().any(|op| op.path == "decision.rationale"));
    }
}
