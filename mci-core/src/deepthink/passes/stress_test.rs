//! STRESS_TEST pass: domain classification + missing-critical-input check.
//!
//! Grounded on
//! `examples/original_source/backend/app/deepthink/passes/stress_test.py`.

use crate::deepthink::decision::{Decision, DecisionAction, PatchOp, PatchValue};
use crate::domain::types::{PassType, MAX_CLARIFY_QUESTION_CHARS, MAX_RATIONALE_CHARS};

use super::{sanitize_clarify_question, PassContext, PassRunResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestDomain {
    Generic,
    CodeTech,
    DeployDevops,
    SecurityPrivacy,
    LegalPolicy,
    MedicalHealth,
    FinanceTax,
    TravelLocal,
    PurchaseRecommendation,
}

const DOMAIN_KEYWORDS: &[(RequestDomain, &[&str])] = &[
    (
        RequestDomain::MedicalHealth,
        &[
            "symptom", "pain", "fever", "illness", "sick", "disease", "diagnosis", "doctor", "hospital",
            "medication", "treatment", "health", "medical", "injury", "bleeding", "chest pain", "breathing",
            "emergency",
        ],
    ),
    (
        RequestDomain::SecurityPrivacy,
        &[
            "security", "vulnerability", "exploit", "attack", "breach", "hack", "privacy", "encryption",
            "authentication", "authorization", "threat", "malware", "phishing", "xss", "sql injection", "csrf",
        ],
    ),
    (
        RequestDomain::DeployDevops,
        &[
            "deploy", "deployment", "railway", "vercel", "docker", "nixpacks", "build", "ci/cd", "pipeline",
            "kubernetes", "aws", "gcp", "azure", "heroku", "netlify", "container", "orchestration",
        ],
    ),
    (
        RequestDomain::CodeTech,
        &[
            "error", "exception", "traceback", "bug", "code", "function", "class", "import", "syntax", "runtime",
            "compile", "debug", "stack trace", "python", "javascript", "java", "typescript", "golang", "rust",
        ],
    ),
    (
        RequestDomain::LegalPolicy,
        &[
            "legal", "law", "regulation", "compliance", "contract", "agreement", "terms", "policy", "liability",
            "lawsuit", "court", "attorney", "jurisdiction", "statute", "gdpr", "copyright", "trademark",
        ],
    ),
    (
        RequestDomain::FinanceTax,
        &[
            "tax", "finance", "investment", "stock", "bond", "mutual fund", "portfolio", "trading",
            "capital gains", "deduction", "filing", "irs", "income", "expense", "budget", "loan", "mortgage",
            "interest",
        ],
    ),
    (
        RequestDomain::TravelLocal,
        &[
            "travel", "trip", "flight", "hotel", "booking", "destination", "vacation", "tourism", "visa",
            "passport", "itinerary", "route", "near me", "nearby", "location", "directions", "restaurant",
        ],
    ),
    (
        RequestDomain::PurchaseRecommendation,
        &[
            "buy", "purchase", "recommend", "suggestion", "best", "review", "product", "compare", "price", "deal",
            "shopping", "store", "laptop", "phone", "camera", "gadget", "appliance",
        ],
    ),
];

fn classify_domain(request_text: &str) -> RequestDomain {
    if request_text.is_empty() {
        return RequestDomain::Generic;
    }
    let lowered = request_text.to_ascii_lowercase();
    for (domain, keywords) in DOMAIN_KEYWORDS {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return *domain;
        }
    }
    RequestDomain::Generic
}

fn critical_inputs(domain: RequestDomain) -> &'static [&'static str] {
    match domain {
        RequestDomain::Generic => &["GOAL", "CONTEXT"],
        RequestDomain::CodeTech => &["LANG_RUNTIME", "ERROR_SYMPTOM", "ENV_CONTEXT"],
        RequestDomain::DeployDevops => &["PLATFORM", "BUILD_STAGE", "ERROR_SYMPTOM"],
        RequestDomain::SecurityPrivacy => &["THREAT_MODEL", "SCOPE_SYSTEM"],
        RequestDomain::LegalPolicy => &["JURISDICTION", "FACTS_SUMMARY"],
        RequestDomain::MedicalHealth => &["SYMPTOMS", "TIMELINE", "SEVERITY_RED_FLAGS"],
        RequestDomain::FinanceTax => &["JURISDICTION", "INSTRUMENT_CONTEXT", "TIME_HORIZON"],
        RequestDomain::TravelLocal => &["LOCATION", "DATES", "PREFERENCES_CONSTRAINTS"],
        RequestDomain::PurchaseRecommendation => &["BUDGET", "REGION", "USE_CASE"],
    }
}

fn is_input_present(input_class: &str, lowered: &str) -> bool {
    let any_of = |kws: &[&str]| kws.iter().any(|kw| lowered.contains(kw));
    match input_class {
        "GOAL" => any_of(&["want", "need", "how to", "help me", "trying to", "goal", "objective"]),
        "CONTEXT" => lowered.chars().count() > 20,
        "LANG_RUNTIME" => any_of(&[
            "python", "javascript", "java", "typescript", "node", "go", "rust", "ruby", "php", "c++", "c#",
        ]),
        "ERROR_SYMPTOM" => any_of(&["error", "exception", "traceback", "failed", "exit code", "crash", "bug", "issue"]),
        "ENV_CONTEXT" => any_of(&[
            "local", "dev", "staging", "production", "environment", "server", "machine", "os", "windows", "linux",
            "mac",
        ]),
        "PLATFORM" => any_of(&[
            "railway", "vercel", "docker", "nixpacks", "aws", "gcp", "azure", "heroku", "netlify", "kubernetes",
        ]),
        "BUILD_STAGE" => any_of(&["build", "compile", "deploy", "start", "runtime", "install", "setup"]),
        "THREAT_MODEL" => any_of(&["attack", "threat", "vulnerability", "exploit", "malicious", "unauthorized"]),
        "SCOPE_SYSTEM" => any_of(&["system", "application", "service", "api", "database", "network", "infrastructure"]),
        "JURISDICTION" => any_of(&[
            "india", "us", "usa", "uk", "california", "texas", "new york", "country", "state", "jurisdiction",
        ]),
        "FACTS_SUMMARY" => lowered.chars().count() > 30,
        "SYMPTOMS" => any_of(&["pain", "fever", "cough", "headache", "nausea", "dizzy", "symptom", "feel", "hurt"]),
        "TIMELINE" => any_of(&["since", "for", "days", "weeks", "months", "started", "began", "ago", "yesterday", "today"]),
        "SEVERITY_RED_FLAGS" => any_of(&["severe", "emergency", "urgent", "chest pain", "bleeding", "unconscious", "difficulty breathing"]),
        "INSTRUMENT_CONTEXT" => any_of(&["stock", "bond", "mutual fund", "etf", "option", "crypto", "investment", "portfolio"]),
        "TIME_HORIZON" => any_of(&["short term", "long term", "year", "years", "month", "months", "retirement", "future"]),
        "LOCATION" => {
            if lowered.contains("near me") || lowered.contains("nearby") {
                any_of(&["city", "town", "village", "bangalore", "mumbai", "delhi", "new york", "london", "san francisco"])
            } else {
                any_of(&["in", "at", "near", "city", "town", "country", "bangalore", "mumbai", "delhi"])
            }
        }
        "DATES" => any_of(&["date", "when", "tomorrow", "next week", "next month", "january", "february", "march", "2024", "2025"]),
        "PREFERENCES_CONSTRAINTS" => any_of(&["prefer", "like", "want", "need", "budget", "cheap", "expensive", "luxury", "constraint"]),
        "BUDGET" => any_of(&["budget", "price", "cost", "under", "below", "cheap", "expensive"]),
        "REGION" => any_of(&["india", "us", "usa", "uk", "europe", "asia", "region", "country", "available in"]),
        "USE_CASE" => any_of(&["for", "use", "purpose", "need", "want", "looking for", "use case"]),
        _ => false,
    }
}

fn humanize(input_class: &str) -> &'static str {
    match input_class {
        "GOAL" => "your specific goal or objective",
        "CONTEXT" => "more context about your situation",
        "LANG_RUNTIME" => "the programming language or runtime",
        "ERROR_SYMPTOM" => "the specific error message or symptom",
        "ENV_CONTEXT" => "your environment details (OS, version, etc.)",
        "PLATFORM" => "the deployment platform you're using",
        "BUILD_STAGE" => "which build stage is failing",
        "THREAT_MODEL" => "the specific threat or attack vector",
        "SCOPE_SYSTEM" => "which system or component is affected",
        "JURISDICTION" => "your jurisdiction (country/state)",
        "FACTS_SUMMARY" => "a summary of the relevant facts",
        "SYMPTOMS" => "specific symptoms you're experiencing",
        "TIMELINE" => "when the symptoms started",
        "SEVERITY_RED_FLAGS" => "severity indicators (emergency symptoms)",
        "INSTRUMENT_CONTEXT" => "the specific financial instrument",
        "TIME_HORIZON" => "your investment time horizon",
        "LOCATION" => "your specific location or city",
        "DATES" => "your travel dates",
        "PREFERENCES_CONSTRAINTS" => "your preferences or constraints",
        "BUDGET" => "your budget range",
        "REGION" => "your region or country",
        "USE_CASE" => "your specific use case or purpose",
        other => other,
    }
}

fn generate_clarify_question(missing: &[&str]) -> String {
    let asked: Vec<&str> = missing.iter().take(3).copied().collect();
    let names: Vec<&str> = asked.iter().map(|c| humanize(c)).collect();
    let question = match names.as_slice() {
        [one] => format!("To answer safely, I need: {one}."),
        [one, two] => format!("To answer safely, I need: (1) {one}, and (2) {two}."),
        _ => {
            let items: Vec<String> = names.iter().enumerate().map(|(i, n)| format!("({}) {n}", i + 1)).collect();
            format!("To answer safely, I need: {}.", items.join(", "))
        }
    };
    let bounded: String = question.chars().take(MAX_CLARIFY_QUESTION_CHARS).collect();
    sanitize_clarify_question(&bounded)
}

fn generate_rationale(missing: &[&str]) -> String {
    if missing.is_empty() {
        return String::new();
    }
    let asked: Vec<&str> = missing.iter().take(3).copied().collect();
    let names: Vec<&str> = asked.iter().map(|c| humanize(c)).collect();
    let rationale = format!(
        "Missing critical information: {}. Clarification needed for safe response.",
        names.join(", ")
    );
    rationale.chars().take(MAX_RATIONALE_CHARS).collect()
}

pub fn run(decision: &Decision, ctx: &PassContext) -> PassRunResult {
    let domain = classify_domain(&ctx.request_text);
    let lowered = ctx.request_text.to_ascii_lowercase();
    let missing: Vec<&str> =
        critical_inputs(domain).iter().copied().filter(|input| !is_input_present(input, &lowered)).collect();

    let mut ops = Vec::new();
    if !missing.is_empty() {
        if decision.action != DecisionAction::AskClarify {
            ops.push(PatchOp::set("decision.action", PatchValue::Action(DecisionAction::AskClarify)));
        }
        ops.push(PatchOp::set("decision.clarify_question", PatchValue::Text(generate_clarify_question(&missing))));
        ops.push(PatchOp::set("decision.rationale", PatchValue::Text(generate_rationale(&missing))));
    }

    ops.sort_by(|a, b| a.path.cmp(&b.path));

    let cost_units = (25 + ctx.request_text.len() / 100 + missing.len() * 5).min(150) as u32;
    let duration_ms = (120 + ctx.request_text.len() / 50 + missing.len() * 10).min(600) as u32;

    PassRunResult { pass_type: PassType::StressTest, delta: ops, cost_units, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_request_with_no_goal_asks_clarify() {
        let decision = Decision::default();
        let ctx = PassContext { request_text: "hi".into() };
        let result = run(&decision, &ctx);
        assert!(result.delta.iter().any(|op| op.path == "decision.action"));
    }

    #[test]
    fn medical_domain_classified_first_when_keywords_match() {
        assert_eq!(classify_domain("I have a fever and chest pain"), RequestDomain::MedicalHealth);
    }

    #[test]
    fn complete_code_request_has_no_missing_inputs() {
        let decision = Decision::default();
        let ctx = PassContext {
            request_text: "I'm getting a traceback in my python script running on linux, it's an exception".into(),
        };
        let result = run(&decision, &ctx);
        assert!(result.delta.is_empty());
    }

    #[test]
    fn clarify_question_capped_to_three_items() {
        let decision = Decision::default();
        let ctx = PassContext { request_text: "".into() };
        let result = run(&decision, &ctx);
        let clarify_op = result.delta.iter().find(|op| op.path == "decision.clarify_question").unwrap();
        if let PatchValue::Text(text) = &clarify_op.value {
            assert!(text.matches('(').count() <= 3);
        }
    }
}
