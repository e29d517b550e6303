//! REGRET pass: versioned weighted scorer forcing safer alternatives past
//! explicit thresholds.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/passes/regret.py`.

use crate::deepthink::decision::{Decision, DecisionAction, PatchOp, PatchValue};
use crate::domain::types::{PassType, MAX_CLARIFY_QUESTION_CHARS, MAX_RATIONALE_CHARS};

use super::{sanitize_clarify_question, PassContext, PassRunResult};

const SAFETY_WEIGHT: f64 = 0.40;
const MISINFO_WEIGHT: f64 = 0.30;
const CONFUSION_WEIGHT: f64 = 0.20;
const USER_COST_WEIGHT: f64 = 0.10;

const SAFETY_HARD_THRESHOLD: i32 = 70;
const FORCE_CLARIFY_THRESHOLD: i32 = 60;

const ABSOLUTE_MARKERS: &[&str] =
    &["definitely", "guaranteed", "100%", "always", "never", "certainly", "absolutely", "without doubt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegretDomain {
    Generic,
    CodeTech,
    DeployDevops,
    SecurityPrivacy,
    LegalPolicy,
    MedicalHealth,
    FinanceTax,
}

const DOMAIN_KEYWORDS: &[(RegretDomain, &[&str])] = &[
    (
        RegretDomain::MedicalHealth,
        &["medical", "health", "symptom", "pain", "fever", "illness", "disease", "doctor", "hospital", "medication", "emergency", "injury"],
    ),
    (
        RegretDomain::SecurityPrivacy,
        &["security", "vulnerability", "exploit", "attack", "breach", "hack", "privacy", "encryption", "authentication", "malware", "phishing"],
    ),
    (
        RegretDomain::LegalPolicy,
        &["legal", "law", "regulation", "compliance", "contract", "liability", "lawsuit", "court", "attorney", "jurisdiction", "gdpr"],
    ),
    (
        RegretDomain::FinanceTax,
        &["tax", "finance", "investment", "stock", "trading", "capital gains", "irs", "deduction", "loan", "mortgage", "portfolio"],
    ),
    (
        RegretDomain::DeployDevops,
        &["deploy", "deployment", "railway", "vercel", "docker", "build", "ci/cd", "kubernetes", "aws", "gcp", "container"],
    ),
    (
        RegretDomain::CodeTech,
        &["error", "exception", "bug", "code", "function", "syntax", "python", "javascript", "java", "compile", "debug"],
    ),
];

fn is_safety_critical(domain: RegretDomain) -> bool {
    matches!(
        domain,
        RegretDomain::MedicalHealth | RegretDomain::LegalPolicy | RegretDomain::SecurityPrivacy | RegretDomain::FinanceTax
    )
}

fn classify_domain(request_text: &str) -> RegretDomain {
    if request_text.is_empty() {
        return RegretDomain::Generic;
    }
    let lowered = request_text.to_ascii_lowercase();
    for (domain, keywords) in DOMAIN_KEYWORDS {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return *domain;
        }
    }
    RegretDomain::Generic
}

fn compute_safety_risk(domain: RegretDomain, action: DecisionAction, answer: &str) -> i32 {
    let mut risk = 0;
    if is_safety_critical(domain) && action == DecisionAction::Answer {
        risk += 40;
        let lowered = answer.to_ascii_lowercase();
        if ABSOLUTE_MARKERS.iter().any(|m| lowered.contains(m)) {
            risk += 15;
        }
        let has_disclaimer = ["may", "might", "could", "typically", "generally", "assuming"].iter().any(|kw| lowered.contains(kw));
        if !has_disclaimer && answer.chars().count() > 20 {
            risk += 20;
        }
    }
    risk.min(100)
}

fn compute_misinfo_risk(answer: &str) -> i32 {
    if answer.is_empty() {
        return 0;
    }
    let lowered = answer.to_ascii_lowercase();
    let absolute_count = ABSOLUTE_MARKERS.iter().filter(|m| lowered.contains(**m)).count() as i32;
    let mut risk = absolute_count * 20;
    let has_caveat = ["however", "but", "although", "depending", "may vary", "typically"].iter().any(|kw| lowered.contains(kw));
    if absolute_count > 0 && !has_caveat {
        risk += 20;
    }
    risk.min(100)
}

fn compute_confusion(action: DecisionAction, answer: &str, rationale: &str, clarify_question: &str) -> i32 {
    let mut confusion = 0;
    if answer.chars().count() > 200 && rationale.chars().count() < 50 {
        confusion += 30;
    }
    if action == DecisionAction::Answer && !clarify_question.is_empty() && clarify_question.chars().count() > 20 {
        confusion += 40;
    }
    confusion.min(100)
}

fn compute_user_cost(action: DecisionAction, clarify_question: &str) -> i32 {
    if action != DecisionAction::AskClarify {
        return 0;
    }
    let mut cost = 40;
    let question_marks = clarify_question.matches('?').count();
    let numbered_items = ["(1)", "(2)", "(3)", "(4)"].iter().filter(|tag| clarify_question.contains(*tag)).count();
    if question_marks.max(numbered_items) > 3 {
        cost += 20;
    }
    cost.min(100)
}

fn generate_clarify_question(domain: RegretDomain, existing: &str) -> String {
    if existing.chars().count() > 20 {
        let sanitized = sanitize_clarify_question(existing);
        return sanitized.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect();
    }
    let question = match domain {
        RegretDomain::MedicalHealth => "To provide safe guidance, I need: (1) specific symptoms, (2) duration, (3) severity indicators.",
        RegretDomain::SecurityPrivacy => "To assess security properly, I need: (1) threat model, (2) affected systems, (3) current safeguards.",
        RegretDomain::LegalPolicy => "To provide accurate legal context, I need: (1) jurisdiction, (2) relevant facts, (3) specific question.",
        RegretDomain::FinanceTax => "To provide financial guidance, I need: (1) jurisdiction, (2) instrument type, (3) time horizon.",
        RegretDomain::CodeTech => "To debug effectively, I need: (1) language/runtime, (2) error message, (3) environment context.",
        RegretDomain::DeployDevops => "To troubleshoot deployment, I need: (1) platform, (2) build stage, (3) error details.",
        RegretDomain::Generic => "To answer accurately, I need: (1) your specific goal, (2) relevant context, (3) any constraints.",
    };
    let sanitized = sanitize_clarify_question(question);
    sanitized.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect()
}

fn tighten_rationale(rationale: &str) -> String {
    if rationale.is_empty() {
        return rationale.to_string();
    }
    let lowered = rationale.to_ascii_lowercase();
    let has_caveat = ["assuming", "typically", "may vary", "depending"].iter().any(|kw| lowered.contains(kw));
    let tightened = if !has_caveat {
        format!("{} This assumes typical conditions and may vary.", rationale.trim())
    } else {
        rationale.to_string()
    };
    tightened.chars().take(MAX_RATIONALE_CHARS).collect()
}

pub fn run(decision: &Decision, ctx: &PassContext) -> PassRunResult {
    let domain = classify_domain(&ctx.request_text);

    let safety_risk = compute_safety_risk(domain, decision.action, &decision.answer);
    let misinfo_risk = compute_misinfo_risk(&decision.answer);
    let confusion = compute_confusion(decision.action, &decision.answer, &decision.rationale, &decision.clarify_question);
    let user_cost = compute_user_cost(decision.action, &decision.clarify_question);

    let total_regret = SAFETY_WEIGHT * safety_risk as f64
        + MISINFO_WEIGHT * misinfo_risk as f64
        + CONFUSION_WEIGHT * confusion as f64
        + USER_COST_WEIGHT * user_cost as f64;

    let mut ops = Vec::new();

    if safety_risk >= SAFETY_HARD_THRESHOLD {
        if decision.action != DecisionAction::Fallback {
            ops.push(PatchOp::set("decision.action", PatchValue::Action(DecisionAction::Fallback)));
        }
        ops.push(PatchOp::set("decision.answer", PatchValue::Text(String::new())));
        let rationale = format!("Safety threshold exceeded (score: {safety_risk}). Conservative fallback applied.");
        ops.push(PatchOp::set(
            "decision.rationale",
            PatchValue::Text(rationale.chars().take(MAX_RATIONALE_CHARS).collect()),
        ));
    } else if total_regret >= FORCE_CLARIFY_THRESHOLD as f64 {
        if decision.action != DecisionAction::AskClarify {
            ops.push(PatchOp::set("decision.action", PatchValue::Action(DecisionAction::AskClarify)));
        }
        let clarify_q = generate_clarify_question(domain, &decision.clarify_question);
        ops.push(PatchOp::set("decision.clarify_question", PatchValue::Text(clarify_q)));
        let rationale = format!("Regret score {} requires clarification to minimize risk.", total_regret as i32);
        ops.push(PatchOp::set(
            "decision.rationale",
            PatchValue::Text(rationale.chars().take(MAX_RATIONALE_CHARS).collect()),
        ));
    } else if decision.action == DecisionAction::Answer && !decision.rationale.is_empty() {
        let tightened = tighten_rationale(&decision.rationale);
        if tightened != decision.rationale {
            ops.push(PatchOp::set("decision.rationale", PatchValue::Text(tightened)));
        }
    }

    ops.sort_by(|a, b| a.path.cmp(&b.path));

    let cost_units =
        (35 + ctx.request_text.len() / 100 + ops.len() * 8 + (total_regret as usize) / 20).min(250) as u32;
    let duration_ms =
        (180 + ctx.request_text.len() / 50 + ops.len() * 15 + (total_regret as usize) / 10).min(800) as u32;

    PassRunResult { pass_type: PassType::Regret, delta: ops, cost_units, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_medical_answer_forces_fallback() {
        let decision = Decision {
            action: DecisionAction::Answer,
            answer: "This will definitely cure it, no need to see a doctor.".into(),
            rationale: "General advice.".into(),
            ..Default::default()
        };
        let ctx = PassContext { request_text: "I have a severe fever and chest pain, what should I do".into() };
        let result = run(&decision, &ctx);
        let action_op = result.delta.iter().find(|op| op.path == "decision.action").unwrap();
        assert_eq!(action_op.value, PatchValue::Action(DecisionAction::Fallback));
    }

    #[test]
    fn benign_answer_with_caveat_is_untouched() {
        let decision = Decision {
            action: DecisionAction::Answer,
            answer: "".into(),
            rationale: "This typically holds depending on context.".into(),
            ..Default::default()
        };
        let result = run(&decision, &PassContext::default());
        assert!(result.delta.is_empty());
    }

    #[test]
    fn regret_version_constant_matches_resolved_value() {
        assert_eq!(crate::domain::types::REGRET_MODEL_VERSION, "17.7.0");
    }
}
