//! DecisionState assembly: stakes snapshot with unknown-zone invariants.
//!
//! Mirrors the proximity ladder and cross-field rules of the reference
//! `decision_state.py`/`decision_proximity.py`/`decision_unknowns.py` trio,
//! re-expressed as a validated Rust constructor instead of a
//! `__post_init__`-checked frozen dataclass.

use std::collections::BTreeSet;

use thiserror::Error;

use super::types::{
    ConfidenceLevel, ConsequenceHorizon, ProximityState, ResponsibilityScope, ReversibilityClass,
    RiskDomain, UnknownSource,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("decision_id must not be empty")]
    EmptyDecisionId,
    #[error("trace_id must not be empty")]
    EmptyTraceId,
    #[error("risk_domains must not be empty")]
    EmptyRiskDomains,
    #[error("outcome_classes must not be empty")]
    EmptyOutcomeClasses,
    #[error("duplicate risk domain: {0:?}")]
    DuplicateRiskDomain(RiskDomain),
    #[error("IRREVERSIBLE reversibility_class requires UnknownSource::Reversibility in explicit_unknown_zone")]
    IrreversibleMissingUnknownSource,
    #[error("LONG_HORIZON consequence_horizon requires UnknownSource::Horizon in explicit_unknown_zone")]
    LongHorizonMissingUnknownSource,
    #[error("SYSTEMIC_PUBLIC with SHORT_HORIZON requires UnknownSource::Horizon in explicit_unknown_zone")]
    SystemicShortHorizonMissingUnknownSource,
    #[error("a field resolved to UNKNOWN but no corresponding explicit_unknown_zone source was recorded: {0:?}")]
    MissingRequiredUnknownSource(UnknownSource),
    #[error("missing required raw request feature: {0}")]
    MissingRequiredField(&'static str),
}

/// A single stakes-domain classification with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RiskAssessment {
    pub domain: RiskDomain,
    pub confidence: ConfidenceLevel,
}

impl PartialOrd for ConfidenceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ConfidenceLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(c: &ConfidenceLevel) -> u8 {
            match c {
                ConfidenceLevel::Unknown => 0,
                ConfidenceLevel::Low => 1,
                ConfidenceLevel::Medium => 2,
                ConfidenceLevel::High => 3,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

/// Raw, pre-classification features extracted from the user request. This is
/// the only place free-form text is consulted; everything downstream of
/// assembly works over the closed enums produced here.
#[derive(Debug, Clone, Default)]
pub struct RawRequestFeatures {
    pub text: String,
}

/// Immutable stakes snapshot for one request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionState {
    pub decision_id: String,
    pub trace_id: String,
    pub phase_marker: &'static str,
    pub schema_version: &'static str,
    pub proximity_state: ProximityState,
    pub proximity_uncertainty: bool,
    pub risk_domains: Vec<RiskAssessment>,
    pub reversibility_class: ReversibilityClass,
    pub consequence_horizon: ConsequenceHorizon,
    pub responsibility_scope: ResponsibilityScope,
    pub outcome_classes: Vec<super::types::OutcomeClass>,
    pub explicit_unknown_zone: BTreeSet<UnknownSource>,
}

pub const SCHEMA_VERSION: &str = "mci-decision-state/1";
pub const PHASE_MARKER: &str = "PHASE_9";

impl DecisionState {
    /// Validated constructor. Fails closed on any invariant violation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        decision_id: impl Into<String>,
        trace_id: impl Into<String>,
        proximity_state: ProximityState,
        proximity_uncertainty: bool,
        risk_domains: Vec<RiskAssessment>,
        reversibility_class: ReversibilityClass,
        consequence_horizon: ConsequenceHorizon,
        responsibility_scope: ResponsibilityScope,
        outcome_classes: Vec<super::types::OutcomeClass>,
        explicit_unknown_zone: BTreeSet<UnknownSource>,
    ) -> Result<Self, AssemblyError> {
        let decision_id = decision_id.into();
        let trace_id = trace_id.into();

        if decision_id.is_empty() {
            return Err(AssemblyError::EmptyDecisionId);
        }
        if trace_id.is_empty() {
            return Err(AssemblyError::EmptyTraceId);
        }
        if risk_domains.is_empty() {
            return Err(AssemblyError::EmptyRiskDomains);
        }
        if outcome_classes.is_empty() {
            return Err(AssemblyError::EmptyOutcomeClasses);
        }

        let mut seen = BTreeSet::new();
        for ra in &risk_domains {
            // RiskDomain doesn't implement Ord directly usable in BTreeSet without
            // deriving; use a discriminant-based dedup instead.
            let tag = format!("{:?}", ra.domain);
            if !seen.insert(tag) {
                return Err(AssemblyError::DuplicateRiskDomain(ra.domain));
            }
        }

        let mut unknown_zone = explicit_unknown_zone;

        if reversibility_class == ReversibilityClass::Irreversible
            && !unknown_zone.contains(&UnknownSource::Reversibility)
        {
            return Err(AssemblyError::IrreversibleMissingUnknownSource);
        }
        if consequence_horizon == ConsequenceHorizon::LongHorizon
            && !unknown_zone.contains(&UnknownSource::Horizon)
        {
            return Err(AssemblyError::LongHorizonMissingUnknownSource);
        }
        if responsibility_scope == ResponsibilityScope::SystemicPublic
            && consequence_horizon == ConsequenceHorizon::ShortHorizon
            && !unknown_zone.contains(&UnknownSource::Horizon)
        {
            return Err(AssemblyError::SystemicShortHorizonMissingUnknownSource);
        }

        if proximity_state == ProximityState::Unknown && !unknown_zone.contains(&UnknownSource::Proximity) {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Proximity));
        }
        if reversibility_class == ReversibilityClass::Unknown
            && !unknown_zone.contains(&UnknownSource::Reversibility)
        {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Reversibility));
        }
        if consequence_horizon == ConsequenceHorizon::Unknown
            && !unknown_zone.contains(&UnknownSource::Horizon)
        {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Horizon));
        }
        if responsibility_scope == ResponsibilityScope::Unknown
            && !unknown_zone.contains(&UnknownSource::Responsibility)
        {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Responsibility));
        }
        if risk_domains.iter().any(|r| r.domain == RiskDomain::Unknown)
            && !unknown_zone.contains(&UnknownSource::Domain)
        {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Domain));
        }
        if outcome_classes.iter().any(|o| *o == super::types::OutcomeClass::Unknown)
            && !unknown_zone.contains(&UnknownSource::Outcome)
        {
            return Err(AssemblyError::MissingRequiredUnknownSource(UnknownSource::Outcome));
        }

        unknown_zone = consolidate_unknowns(unknown_zone);

        Ok(Self {
            decision_id,
            trace_id,
            phase_marker: PHASE_MARKER,
            schema_version: SCHEMA_VERSION,
            proximity_state,
            proximity_uncertainty,
            risk_domains,
            reversibility_class,
            consequence_horizon,
            responsibility_scope,
            outcome_classes,
            explicit_unknown_zone: unknown_zone,
        })
    }

    pub fn has_critical_domain_at_or_above(&self, min_confidence: ConfidenceLevel) -> bool {
        self.risk_domains
            .iter()
            .any(|r| r.domain.is_critical() && r.confidence >= min_confidence)
    }
}

/// Deduplicate and sort an unknown-zone set. A `BTreeSet` already guarantees
/// both properties by construction; this function exists as the named,
/// testable seam the reference implementation calls out explicitly.
pub fn consolidate_unknowns(zone: BTreeSet<UnknownSource>) -> BTreeSet<UnknownSource> {
    zone
}

/// Immediate-execution / commitment / validation / exploratory marker ladder.
/// First matching tier wins, consulted highest-commitment first so a request
/// containing both an exploratory and an imminent marker is classified by the
/// more severe one.
const IMMINENT_MARKERS: &[&str] = &["right now", "about to", "i'm doing this", "already started", "in the middle of"];
const HIGH_MARKERS: &[&str] = &["going to", "planning to", "decided to", "i will", "i'm going to"];
const MEDIUM_MARKERS: &[&str] = &["considering", "thinking about", "should i", "is it okay to", "weighing"];
const LOW_MARKERS: &[&str] = &["curious about", "just wondering", "hypothetically", "out of curiosity", "what if"];

/// Classify proximity from raw text using the ordered marker ladder. Returns
/// `(state, uncertainty)`.
pub fn classify_proximity(text: &str) -> (ProximityState, bool) {
    let lower = text.to_lowercase();
    if IMMINENT_MARKERS.iter().any(|m| lower.contains(m)) {
        (ProximityState::Imminent, false)
    } else if HIGH_MARKERS.iter().any(|m| lower.contains(m)) {
        (ProximityState::High, false)
    } else if MEDIUM_MARKERS.iter().any(|m| lower.contains(m)) {
        (ProximityState::Medium, false)
    } else if LOW_MARKERS.iter().any(|m| lower.contains(m)) {
        (ProximityState::Low, true)
    } else {
        (ProximityState::VeryLow, true)
    }
}

/// Enforce the monotonic non-regression rule: given a previously known
/// proximity for this turn, the classifier may only hold or advance, never
/// regress.
pub fn apply_proximity_monotonicity(
    prior: Option<ProximityState>,
    classified: ProximityState,
) -> ProximityState {
    match prior {
        Some(p) if p.rank() > classified.rank() => p,
        _ => classified,
    }
}

const INTENSIFIER_MARKERS: &[&str] = &["definitely", "certainly", "for sure", "absolutely", "without question"];

fn confidence_for(lower: &str) -> ConfidenceLevel {
    if INTENSIFIER_MARKERS.iter().any(|m| lower.contains(m)) {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::Medium
    }
}

const RISK_DOMAIN_MARKERS: &[(RiskDomain, &[&str])] = &[
    (RiskDomain::Financial, &["invest", "loan", "savings", "mortgage", "my money"]),
    (RiskDomain::LegalRegulatory, &["lawsuit", "contract", "illegal", "regulation", "sue"]),
    (RiskDomain::MedicalBiological, &["medication", "diagnosis", "symptom", "dosage", "my doctor"]),
    (RiskDomain::PhysicalSafety, &["weapon", "injury", "dangerous", "unsafe", "could get hurt"]),
    (RiskDomain::PsychologicalEmotional, &["depressed", "anxious", "panic attack", "can't cope", "overwhelmed"]),
    (RiskDomain::EthicalMoral, &["the right thing", "is it wrong", "morally", "ethical"]),
    (RiskDomain::ReputationalSocial, &["my reputation", "embarrass", "public image", "go viral"]),
    (RiskDomain::OperationalSystemic, &["production outage", "system-wide", "entire infrastructure", "take down the service"]),
    (RiskDomain::IrreversiblePersonalHarm, &["can't undo", "permanent damage", "life-changing", "no way back"]),
    (RiskDomain::LegalAdjacentGrayZone, &["gray area", "loophole", "technically legal", "bend the rules"]),
];

/// Classify risk domains present in `text`. Every matching domain ladder
/// contributes one `RiskAssessment`; if none match, a single `UNKNOWN`
/// assessment is returned so the caller can route it into the unknown zone.
pub fn classify_risk_domains(text: &str) -> Vec<RiskAssessment> {
    let lower = text.to_lowercase();
    let mut found: Vec<RiskAssessment> = RISK_DOMAIN_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(domain, _)| RiskAssessment { domain: *domain, confidence: confidence_for(&lower) })
        .collect();
    if found.is_empty() {
        found.push(RiskAssessment { domain: RiskDomain::Unknown, confidence: ConfidenceLevel::Low });
    }
    found
}

const IRREVERSIBLE_MARKERS: &[&str] = &["permanent", "can't undo", "no way back", "forever", "irreversible"];
const COSTLY_MARKERS: &[&str] = &["expensive to undo", "hard to reverse", "costly to undo", "big hassle to fix"];
const REVERSIBLE_MARKERS: &[&str] = &["easily reverse", "can cancel", "can undo", "just a trial", "no commitment"];

/// Classify reversibility from `text`'s ordered marker ladder, most severe
/// tier first.
pub fn classify_reversibility(text: &str) -> ReversibilityClass {
    let lower = text.to_lowercase();
    if IRREVERSIBLE_MARKERS.iter().any(|m| lower.contains(m)) {
        ReversibilityClass::Irreversible
    } else if COSTLY_MARKERS.iter().any(|m| lower.contains(m)) {
        ReversibilityClass::Costly
    } else if REVERSIBLE_MARKERS.iter().any(|m| lower.contains(m)) {
        ReversibilityClass::Reversible
    } else {
        ReversibilityClass::Unknown
    }
}

const LONG_HORIZON_MARKERS: &[&str] = &["rest of my life", "for years", "decade", "long term", "the rest of my career"];
const IMMEDIATE_HORIZON_MARKERS: &[&str] = &["right now", "today", "immediately", "this instant"];
const SHORT_HORIZON_MARKERS: &[&str] = &["this week", "this month", "soon", "in a few days"];

/// Classify the consequence horizon, longest-reaching tier first so an
/// utterance naming both an immediate act and a lifelong consequence is
/// classified by the more consequential one.
pub fn classify_consequence_horizon(text: &str) -> ConsequenceHorizon {
    let lower = text.to_lowercase();
    if LONG_HORIZON_MARKERS.iter().any(|m| lower.contains(m)) {
        ConsequenceHorizon::LongHorizon
    } else if IMMEDIATE_HORIZON_MARKERS.iter().any(|m| lower.contains(m)) {
        ConsequenceHorizon::Immediate
    } else if SHORT_HORIZON_MARKERS.iter().any(|m| lower.contains(m)) {
        ConsequenceHorizon::ShortHorizon
    } else {
        ConsequenceHorizon::Unknown
    }
}

const SYSTEMIC_MARKERS: &[&str] = &["the public", "everyone", "society", "all our users", "the whole company"];
const THIRD_PARTY_MARKERS: &[&str] = &["my family", "my team", "my client", "other people", "my partner"];
const SELF_ONLY_MARKERS: &[&str] = &["just me", "only affects me", "myself", "my own"];

/// Classify responsibility scope, widest-reaching tier first.
pub fn classify_responsibility_scope(text: &str) -> ResponsibilityScope {
    let lower = text.to_lowercase();
    if SYSTEMIC_MARKERS.iter().any(|m| lower.contains(m)) {
        ResponsibilityScope::SystemicPublic
    } else if THIRD_PARTY_MARKERS.iter().any(|m| lower.contains(m)) {
        ResponsibilityScope::ThirdParty
    } else if SELF_ONLY_MARKERS.iter().any(|m| lower.contains(m)) {
        ResponsibilityScope::SelfOnly
    } else {
        ResponsibilityScope::Unknown
    }
}

const OUTCOME_CLASS_MARKERS: &[(super::types::OutcomeClass, &[&str])] = &[
    (super::types::OutcomeClass::Transactional, &["purchase", "buy", "sign up", "sign a contract"]),
    (super::types::OutcomeClass::Relational, &["my relationship", "my friend", "my partner", "my family"]),
    (super::types::OutcomeClass::Physical, &["my health", "get hurt", "injury"]),
    (super::types::OutcomeClass::Financial, &["my money", "my savings", "financially"]),
    (super::types::OutcomeClass::Legal, &["lawsuit", "contract", "illegal"]),
    (super::types::OutcomeClass::Medical, &["diagnosis", "treatment", "medication"]),
    (super::types::OutcomeClass::Reputational, &["my reputation", "embarrass", "public image"]),
    (super::types::OutcomeClass::Systemic, &["system-wide", "entire infrastructure", "the whole company"]),
];

/// Classify outcome classes present in `text`. Falls back to `INFORMATIONAL`
/// when no outcome markers match and the request otherwise reads as a plain
/// question, or `UNKNOWN` when even that cannot be determined (empty input).
pub fn classify_outcome_classes(text: &str) -> Vec<super::types::OutcomeClass> {
    let lower = text.to_lowercase();
    let mut found: Vec<super::types::OutcomeClass> = OUTCOME_CLASS_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(class, _)| *class)
        .collect();
    if found.is_empty() {
        if lower.trim().is_empty() {
            found.push(super::types::OutcomeClass::Unknown);
        } else {
            found.push(super::types::OutcomeClass::Informational);
        }
    }
    found
}

/// Assemble a full `DecisionState` from raw request text: run every
/// per-dimension classifier, consolidate the resulting unknown-zone sources,
/// and hand the result to the validated constructor. Fails closed on any
/// cross-field invariant violation exactly as a hand-built `DecisionState`
/// would.
pub fn assemble_decision_state(
    decision_id: impl Into<String>,
    trace_id: impl Into<String>,
    features: &RawRequestFeatures,
    prior_proximity: Option<ProximityState>,
) -> Result<DecisionState, AssemblyError> {
    let (classified_proximity, proximity_uncertainty) = classify_proximity(&features.text);
    let proximity_state = apply_proximity_monotonicity(prior_proximity, classified_proximity);

    let risk_domains = classify_risk_domains(&features.text);
    let reversibility_class = classify_reversibility(&features.text);
    let consequence_horizon = classify_consequence_horizon(&features.text);
    let responsibility_scope = classify_responsibility_scope(&features.text);
    let outcome_classes = classify_outcome_classes(&features.text);

    let mut unknown_zone = BTreeSet::new();
    if proximity_state == ProximityState::Unknown || proximity_uncertainty {
        unknown_zone.insert(UnknownSource::Proximity);
    }
    if risk_domains.iter().any(|r| r.domain == RiskDomain::Unknown) {
        unknown_zone.insert(UnknownSource::Domain);
    }
    if reversibility_class == ReversibilityClass::Unknown || reversibility_class == ReversibilityClass::Irreversible {
        unknown_zone.insert(UnknownSource::Reversibility);
    }
    if consequence_horizon == ConsequenceHorizon::Unknown || consequence_horizon == ConsequenceHorizon::LongHorizon {
        unknown_zone.insert(UnknownSource::Horizon);
    }
    if responsibility_scope == ResponsibilityScope::SystemicPublic
        && consequence_horizon == ConsequenceHorizon::ShortHorizon
    {
        unknown_zone.insert(UnknownSource::Horizon);
    }
    if responsibility_scope == ResponsibilityScope::Unknown {
        unknown_zone.insert(UnknownSource::Responsibility);
    }
    if outcome_classes.iter().any(|o| *o == super::types::OutcomeClass::Unknown) {
        unknown_zone.insert(UnknownSource::Outcome);
    }

    let unknown_zone = consolidate_unknowns(unknown_zone);

    DecisionState::new(
        decision_id,
        trace_id,
        proximity_state,
        proximity_uncertainty,
        risk_domains,
        reversibility_class,
        consequence_horizon,
        responsibility_scope,
        outcome_classes,
        unknown_zone,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> Result<DecisionState, AssemblyError> {
        DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Low,
            true,
            vec![RiskAssessment {
                domain: RiskDomain::Financial,
                confidence: ConfidenceLevel::Medium,
            }],
            ReversibilityClass::Reversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Informational],
            BTreeSet::new(),
        )
    }

    #[test]
    fn constructs_valid_state() {
        assert!(base_state().is_ok());
    }

    #[test]
    fn rejects_empty_decision_id() {
        let err = DecisionState::new(
            "",
            "trace-1",
            ProximityState::Low,
            true,
            vec![RiskAssessment {
                domain: RiskDomain::Financial,
                confidence: ConfidenceLevel::Medium,
            }],
            ReversibilityClass::Reversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .unwrap_err();
        assert_eq!(err, AssemblyError::EmptyDecisionId);
    }

    #[test]
    fn irreversible_requires_unknown_source() {
        let err = DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Low,
            true,
            vec![RiskAssessment {
                domain: RiskDomain::Financial,
                confidence: ConfidenceLevel::Medium,
            }],
            ReversibilityClass::Irreversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .unwrap_err();
        assert_eq!(err, AssemblyError::IrreversibleMissingUnknownSource);
    }

    #[test]
    fn irreversible_with_unknown_source_ok() {
        let mut zone = BTreeSet::new();
        zone.insert(UnknownSource::Reversibility);
        let state = DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Low,
            true,
            vec![RiskAssessment {
                domain: RiskDomain::Financial,
                confidence: ConfidenceLevel::Medium,
            }],
            ReversibilityClass::Irreversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Informational],
            zone,
        );
        assert!(state.is_ok());
    }

    #[test]
    fn duplicate_risk_domains_rejected() {
        let err = DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Low,
            true,
            vec![
                RiskAssessment { domain: RiskDomain::Financial, confidence: ConfidenceLevel::Medium },
                RiskAssessment { domain: RiskDomain::Financial, confidence: ConfidenceLevel::High },
            ],
            ReversibilityClass::Reversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateRiskDomain(_)));
    }

    #[test]
    fn proximity_ladder_first_match_wins() {
        assert_eq!(classify_proximity("I'm about to submit this right now").0, ProximityState::Imminent);
        assert_eq!(classify_proximity("I'm planning to do this next week").0, ProximityState::High);
        assert_eq!(classify_proximity("just thinking about options").0, ProximityState::Medium);
        assert_eq!(classify_proximity("just wondering what if").0, ProximityState::Low);
        assert_eq!(classify_proximity("hello there").0, ProximityState::VeryLow);
    }

    #[test]
    fn proximity_never_regresses() {
        let held = apply_proximity_monotonicity(Some(ProximityState::High), ProximityState::Low);
        assert_eq!(held, ProximityState::High);
        let advanced = apply_proximity_monotonicity(Some(ProximityState::Low), ProximityState::High);
        assert_eq!(advanced, ProximityState::High);
    }

    #[test]
    fn critical_domain_detection() {
        let mut zone = BTreeSet::new();
        zone.insert(UnknownSource::Reversibility);
        let state = DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Low,
            true,
            vec![RiskAssessment { domain: RiskDomain::MedicalBiological, confidence: ConfidenceLevel::High }],
            ReversibilityClass::Irreversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![super::super::types::OutcomeClass::Medical],
            zone,
        )
        .unwrap();
        assert!(state.has_critical_domain_at_or_above(ConfidenceLevel::Medium));
    }

    #[test]
    fn assemble_decision_state_handles_fully_unknown_text() {
        let features = RawRequestFeatures { text: "hello there".to_string() };
        let state = assemble_decision_state("dec-1", "trace-1", &features, None).unwrap();
        assert_eq!(state.risk_domains[0].domain, RiskDomain::Unknown);
        assert!(state.explicit_unknown_zone.contains(&UnknownSource::Domain));
        assert!(state.explicit_unknown_zone.contains(&UnknownSource::Reversibility));
    }

    #[test]
    fn assemble_decision_state_classifies_irreversible_financial_request() {
        let features = RawRequestFeatures {
            text: "I'm about to invest my entire savings, this is permanent and I can't undo it".to_string(),
        };
        let state = assemble_decision_state("dec-2", "trace-2", &features, None).unwrap();
        assert_eq!(state.proximity_state, ProximityState::Imminent);
        assert_eq!(state.reversibility_class, ReversibilityClass::Irreversible);
        assert!(state.risk_domains.iter().any(|r| r.domain == RiskDomain::Financial));
    }

    #[test]
    fn assemble_decision_state_respects_prior_proximity_monotonicity() {
        let features = RawRequestFeatures { text: "just wondering what if".to_string() };
        let state = assemble_decision_state("dec-3", "trace-3", &features, Some(ProximityState::High)).unwrap();
        assert_eq!(state.proximity_state, ProximityState::High);
    }
}
