//! ALTERNATIVES pass: generates stay/clarify/fallback candidates, scores
//! and ranks them, rewrites the decision to the winner.
//!
//! Grounded on
//! `examples/original_source/backend/app/deepthink/passes/alternatives.py`.

use sha2::{Digest, Sha256};

use crate::deepthink::decision::{Decision, DecisionAction, PatchOp, PatchValue};
use crate::domain::types::{
    PassType, MAX_ALTERNATIVES_COUNT, MAX_ALTERNATIVE_CHARS, MAX_ANSWER_CHARS, MAX_CLARIFY_QUESTION_CHARS,
    MAX_RATIONALE_CHARS,
};

use super::{sanitize_clarify_question, PassContext, PassRunResult};

const ABSOLUTE_PATTERNS: &[&str] = &["guaranteed", "100%", "always", "never", "definitely", "certainly", "absolutely"];

const SAFETY_CRITICAL_KEYWORDS: &[&str] = &[
    "medical", "health", "symptom", "pain", "emergency", "legal", "law", "contract", "liability", "finance", "tax",
    "investment", "trading", "security", "vulnerability", "exploit", "breach",
];

const AMBIGUITY_KEYWORDS: &[&str] = &["best", "which", "near me", "latest", "recommend", "it depends", "unclear", "not sure"];

#[derive(Debug, Clone)]
struct Candidate {
    action: DecisionAction,
    answer: String,
    rationale: String,
    clarify_question: String,
    risk_score: i32,
    clarity_score: i32,
    cost_score: i32,
    tie_break: String,
}

impl Candidate {
    fn canonical_string(&self) -> String {
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        format!(
            "{:?}|{}|{}|{}",
            self.action,
            normalize(&self.answer),
            normalize(&self.rationale),
            normalize(&self.clarify_question)
        )
    }

    fn sort_key(&self) -> (i32, i32, i32, String) {
        (self.risk_score, -self.clarity_score, self.cost_score, self.tie_break.clone())
    }
}

fn tighten_rationale(rationale: &str) -> String {
    if rationale.is_empty() {
        return "This approach assumes typical conditions and may vary based on context.".to_string();
    }
    let lowered = rationale.to_ascii_lowercase();
    let tightened = if !lowered.contains("assuming") && !lowered.contains("based on") {
        format!("{} This assumes standard conditions.", rationale.trim())
    } else {
        rationale.to_string()
    };
    tightened.chars().take(MAX_RATIONALE_CHARS).collect()
}

fn generate_safe_clarify_question(request_text: &str, answer: &str) -> String {
    let lowered = request_text.to_ascii_lowercase();
    let question = if ["best", "recommend", "which"].iter().any(|kw| lowered.contains(kw)) {
        "Could you specify your specific requirements or constraints?"
    } else if lowered.contains("near me") {
        "Could you specify your location or city?"
    } else if answer.chars().count() < 20 {
        "Could you provide more context about your goal?"
    } else {
        "Could you clarify which specific aspect you're asking about?"
    };
    let sanitized = sanitize_clarify_question(question);
    sanitized.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect()
}

fn refine_clarify_question(current: &str) -> String {
    if current.is_empty() {
        return "Could you provide more specific details?".to_string();
    }
    let trimmed = current.trim();
    let refined: String = if trimmed.chars().count() > 200 {
        let mut truncated: String = trimmed.chars().take(197).collect();
        truncated.push_str("...");
        truncated
    } else {
        trimmed.to_string()
    };
    let sanitized = sanitize_clarify_question(&refined);
    sanitized.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect()
}

fn generate_candidates(decision: &Decision, request_text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(3);

    let stay_answer = if decision.answer.is_empty() { "Proceeding with current approach.".to_string() } else { decision.answer.clone() };
    candidates.push(Candidate {
        action: decision.action,
        answer: stay_answer,
        rationale: tighten_rationale(&decision.rationale),
        clarify_question: decision.clarify_question.clone(),
        risk_score: 0,
        clarity_score: 0,
        cost_score: 0,
        tie_break: String::new(),
    });

    if decision.action != DecisionAction::AskClarify {
        candidates.push(Candidate {
            action: DecisionAction::AskClarify,
            answer: String::new(),
            rationale: "Additional clarification needed to ensure accuracy.".to_string(),
            clarify_question: generate_safe_clarify_question(request_text, &decision.answer),
            risk_score: 0,
            clarity_score: 0,
            cost_score: 0,
            tie_break: String::new(),
        });
    } else {
        candidates.push(Candidate {
            action: DecisionAction::AskClarify,
            answer: String::new(),
            rationale: "Refining clarification request for precision.".to_string(),
            clarify_question: refine_clarify_question(&decision.clarify_question),
            risk_score: 0,
            clarity_score: 0,
            cost_score: 0,
            tie_break: String::new(),
        });
    }

    candidates.push(Candidate {
        action: DecisionAction::Fallback,
        answer: String::new(),
        rationale: "Conservative fallback to ensure safety.".to_string(),
        clarify_question: String::new(),
        risk_score: 0,
        clarity_score: 0,
        cost_score: 0,
        tie_break: String::new(),
    });

    candidates
}

fn compute_risk_score(candidate: &Candidate, request_text: &str) -> i32 {
    let mut risk = 0;
    let lowered_request = request_text.to_ascii_lowercase();

    if candidate.action == DecisionAction::Answer {
        let lowered_answer = candidate.answer.to_ascii_lowercase();
        for pattern in ABSOLUTE_PATTERNS {
            if lowered_answer.contains(pattern) {
                risk += 15;
            }
        }
        if candidate.answer.chars().count() < 30 {
            risk += 10;
        }
    }

    if SAFETY_CRITICAL_KEYWORDS.iter().any(|kw| lowered_request.contains(kw)) {
        risk += 20;
    }

    if candidate.action == DecisionAction::Answer && candidate.clarify_question.is_empty() {
        if AMBIGUITY_KEYWORDS.iter().any(|kw| lowered_request.contains(kw)) {
            risk += 15;
        }
    }

    match candidate.action {
        DecisionAction::AskClarify => risk = (risk - 20).max(0),
        DecisionAction::Fallback => risk = (risk - 30).max(0),
        _ => {}
    }

    risk.min(100)
}

fn compute_clarity_score(candidate: &Candidate) -> i32 {
    let mut clarity = 50;
    match candidate.action {
        DecisionAction::AskClarify => {
            if candidate.clarify_question.chars().count() > 20 {
                clarity += 30;
            } else {
                clarity += 10;
            }
        }
        DecisionAction::Answer => {
            if candidate.answer.chars().count() > 50 {
                clarity += 20;
            } else {
                clarity -= 10;
            }
            let lowered = candidate.answer.to_ascii_lowercase();
            let hedge_count = ["maybe", "might", "could", "possibly", "perhaps"]
                .iter()
                .filter(|w| lowered.contains(**w))
                .count() as i32;
            clarity -= hedge_count * 5;
        }
        DecisionAction::Fallback => clarity -= 20,
        DecisionAction::Refuse => {}
    }
    clarity.clamp(0, 100)
}

fn compute_cost_score(candidate: &Candidate) -> i32 {
    match candidate.action {
        DecisionAction::AskClarify => 40,
        DecisionAction::Answer => 10,
        DecisionAction::Refuse => 5,
        DecisionAction::Fallback => 20,
    }
}

fn tie_break_hash(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    let hex = format!("{digest:x}");
    hex[..12].to_string()
}

fn select_distinct(mut candidates: Vec<Candidate>, max_count: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut seen = std::collections::BTreeSet::new();
    let mut distinct = Vec::new();
    for candidate in candidates {
        let canonical = candidate.canonical_string();
        if seen.insert(canonical) {
            distinct.push(candidate);
            if distinct.len() >= max_count {
                break;
            }
        }
    }
    distinct
}

fn alternatives_summary(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .iter()
        .take(MAX_ALTERNATIVES_COUNT)
        .map(|c| {
            let summary = match c.action {
                DecisionAction::Answer => format!("ANSWER: {}", c.answer.chars().take(150).collect::<String>()),
                DecisionAction::AskClarify => {
                    format!("ASK_CLARIFY: {}", c.clarify_question.chars().take(150).collect::<String>())
                }
                DecisionAction::Fallback => "FALLBACK: Conservative safe response".to_string(),
                DecisionAction::Refuse => "REFUSE: Cannot safely answer".to_string(),
            };
            summary.chars().take(MAX_ALTERNATIVE_CHARS).collect()
        })
        .collect()
}

pub fn run(decision: &Decision, ctx: &PassContext) -> PassRunResult {
    let mut candidates = generate_candidates(decision, &ctx.request_text);
    for candidate in candidates.iter_mut() {
        candidate.risk_score = compute_risk_score(candidate, &ctx.request_text);
        candidate.clarity_score = compute_clarity_score(candidate);
        candidate.cost_score = compute_cost_score(candidate);
        candidate.tie_break = tie_break_hash(&candidate.canonical_string());
    }

    let mut distinct = select_distinct(candidates, 3);
    if distinct.len() < 2 {
        distinct.push(Candidate {
            action: DecisionAction::Fallback,
            answer: String::new(),
            rationale: "Insufficient information for safe response.".to_string(),
            clarify_question: String::new(),
            risk_score: 0,
            clarity_score: 50,
            cost_score: 0,
            tie_break: String::new(),
        });
    }
    let final_candidates: Vec<Candidate> = distinct.into_iter().take(3).collect();
    let best = &final_candidates[0];

    let mut ops = Vec::new();
    if best.action != decision.action {
        ops.push(PatchOp::set("decision.action", PatchValue::Action(best.action)));
    }
    if best.answer != decision.answer {
        let bounded: String = best.answer.chars().take(MAX_ANSWER_CHARS).collect();
        ops.push(PatchOp::set("decision.answer", PatchValue::Text(bounded)));
    }
    if best.rationale != decision.rationale {
        let bounded: String = best.rationale.chars().take(MAX_RATIONALE_CHARS).collect();
        ops.push(PatchOp::set("decision.rationale", PatchValue::Text(bounded)));
    }
    if best.clarify_question != decision.clarify_question {
        let bounded: String = best.clarify_question.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect();
        ops.push(PatchOp::set("decision.clarify_question", PatchValue::Text(bounded)));
    }
    let summary = alternatives_summary(&final_candidates);
    ops.push(PatchOp::set("decision.alternatives", PatchValue::StringList(summary)));

    ops.sort_by(|a, b| a.path.cmp(&b.path));

    let cost_units = (30 + ctx.request_text.len() / 100 + final_candidates.len() * 10).min(200) as u32;
    let duration_ms = (150 + ctx.request_text.len() / 50 + final_candidates.len() * 20).min(700) as u32;

    PassRunResult { pass_type: PassType::Alternatives, delta: ops, cost_units, duration_ms }
}
