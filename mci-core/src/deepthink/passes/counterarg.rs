//! COUNTERARG pass: downgrades overconfident language, converts ANSWER to
//! ASK_CLARIFY when critical input is plainly missing.
//!
//! Grounded on
//! `examples/original_source/backend/app/deepthink/passes/counterargument.py`.

use crate::deepthink::decision::{Decision, DecisionAction, PatchOp, PatchValue};
use crate::domain::types::{PassType, MAX_ANSWER_CHARS, MAX_CLARIFY_QUESTION_CHARS, MAX_RATIONALE_CHARS};

use super::{sanitize_clarify_question, PassContext, PassRunResult};

const ABSOLUTE_CLAIM_PATTERNS: &[(&str, &str)] = &[
    ("definitely", "likely"),
    ("guaranteed", "expected"),
    ("100%", "highly probable"),
    ("always", "typically"),
    ("never", "rarely"),
    ("certainly", "probably"),
    ("absolutely", "generally"),
    ("without doubt", "with high confidence"),
    ("no question", "most likely"),
    ("for sure", "very likely"),
];

const AMBIGUITY_PATTERNS: &[&str] = &["it depends", "depends on"];

fn needs_clarification(answer: &str, rationale: &str) -> bool {
    if answer.trim().chars().count() < 10 {
        return true;
    }
    if rationale.trim().chars().count() < 10 {
        return true;
    }
    let lowered = answer.to_ascii_lowercase();
    AMBIGUITY_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

fn generate_clarify_question(answer: &str, rationale: &str, existing: &str) -> String {
    if !existing.is_empty() {
        let sanitized = sanitize_clarify_question(existing);
        return sanitized.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect();
    }
    let question = if answer.trim().chars().count() < 10 {
        "Could you clarify what specific information or outcome you're looking for?"
    } else if rationale.trim().chars().count() < 10 {
        "Could you provide more context about your goal or requirements?"
    } else {
        "Could you specify which option or scenario you're referring to?"
    };
    question.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect()
}

fn tighten_rationale_for_clarification(rationale: &str) -> String {
    if rationale.is_empty() {
        return "Additional information is needed to provide a complete answer.".to_string();
    }
    let lowered = rationale.to_ascii_lowercase();
    let tightened = if !lowered.contains("clarification") && !lowered.contains("more information") {
        format!("{} Additional clarification is needed to ensure accuracy.", rationale.trim())
    } else {
        rationale.to_string()
    };
    tightened.chars().take(MAX_RATIONALE_CHARS).collect()
}

fn tighten_rationale(rationale: &str) -> String {
    if rationale.is_empty() {
        return rationale.to_string();
    }
    let lowered = rationale.to_ascii_lowercase();
    let has_absolute = ABSOLUTE_CLAIM_PATTERNS.iter().any(|(pattern, _)| lowered.contains(pattern));
    let tightened = if has_absolute && !lowered.contains("assuming") && !lowered.contains("based on") {
        format!("{} This assumes typical conditions and may vary based on specific context.", rationale.trim())
    } else {
        rationale.to_string()
    };
    tightened.chars().take(MAX_RATIONALE_CHARS).collect()
}

fn soften_answer(answer: &str) -> String {
    if answer.is_empty() {
        return answer.to_string();
    }
    let mut softened = answer.to_string();
    for (absolute, softer) in ABSOLUTE_CLAIM_PATTERNS {
        if let Some(pos) = softened.to_ascii_lowercase().find(absolute) {
            softened.replace_range(pos..pos + absolute.len(), softer);
        }
    }
    softened.chars().take(MAX_ANSWER_CHARS).collect()
}

pub fn run(decision: &Decision, ctx: &PassContext) -> PassRunResult {
    let mut ops = Vec::new();
    let needs_clarify = needs_clarification(&decision.answer, &decision.rationale);

    if needs_clarify && decision.action == DecisionAction::Answer {
        ops.push(PatchOp::set("decision.action", PatchValue::Action(DecisionAction::AskClarify)));
        let clarify_q = generate_clarify_question(&decision.answer, &decision.rationale, &decision.clarify_question);
        ops.push(PatchOp::set("decision.clarify_question", PatchValue::Text(clarify_q)));
        let tightened = tighten_rationale_for_clarification(&decision.rationale);
        if tightened != decision.rationale {
            ops.push(PatchOp::set("decision.rationale", PatchValue::Text(tightened)));
        }
    } else if decision.action == DecisionAction::Answer {
        let tightened = tighten_rationale(&decision.rationale);
        if tightened != decision.rationale {
            ops.push(PatchOp::set("decision.rationale", PatchValue::Text(tightened)));
        }
        let softened = soften_answer(&decision.answer);
        if softened != decision.answer {
            ops.push(PatchOp::set("decision.answer", PatchValue::Text(softened)));
        }
    } else {
        let tightened = tighten_rationale(&decision.rationale);
        if tightened != decision.rationale {
            ops.push(PatchOp::set("decision.rationale", PatchValue::Text(tightened)));
        }
    }

    ops.sort_by(|a, b| a.path.cmp(&b.path));

    let text_len = decision.answer.len() + decision.rationale.len() + ctx.request_text.len();
    let cost_units = (20 + text_len / 50).min(100) as u32;
    let duration_ms = (100 + text_len / 20).min(500) as u32;

    PassRunResult { pass_type: PassType::Counterarg, delta: ops, cost_units, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_answer_converts_to_ask_clarify() {
        let decision = Decision {
            action: DecisionAction::Answer,
            answer: "yes".into(),
            rationale: "because".into(),
            ..Default::default()
        };
        let result = run(&decision, &PassContext::default());
        let action_op = result.delta.iter().find(|op| op.path == "decision.action").unwrap();
        assert_eq!(action_op.value, PatchValue::Action(DecisionAction::AskClarify));
    }

    #[test]
    fn absolute_language_is_softened() {
        let decision = Decision {
            action: DecisionAction::Answer,
            answer: "This will definitely work for your case today.".into(),
            rationale: "Based on typical configurations observed previously.".into(),
            ..Default::default()
        };
        let result = run(&decision, &PassContext::default());
        let answer_op = result.delta.iter().find(|op| op.path == "decision.answer");
        if let Some(op) = answer_op {
            if let PatchValue::Text(text) = &op.value {
                assert!(!text.to_lowercase().contains("definitely"));
            }
        }
    }

    #[test]
    fn clarify_question_sanitized_of_forbidden_phrases() {
        let decision = Decision {
            action: DecisionAction::Answer,
            answer: "ok".into(),
            rationale: "short".into(),
            clarify_question: "please upload your logs".into(),
            ..Default::default()
        };
        let result = run(&decision, &PassContext::default());
        let clarify_op = result.delta.iter().find(|op| op.path == "decision.clarify_question").unwrap();
        if let PatchValue::Text(text) = &clarify_op.value {
            assert!(!text.to_lowercase().contains("upload"));
        }
    }
}
