//! Closed enums and bound constants shared across the decision pipeline.

use serde::{Deserialize, Serialize};

/// How soon the user appears ready to act on the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProximityState {
    VeryLow,
    Low,
    Medium,
    High,
    Imminent,
    Unknown,
}

impl ProximityState {
    /// Ordering used for the monotonic non-regression check; `Unknown` sorts
    /// below every known value so it never counts as a regression target.
    pub fn rank(self) -> u8 {
        match self {
            ProximityState::Unknown => 0,
            ProximityState::VeryLow => 1,
            ProximityState::Low => 2,
            ProximityState::Medium => 3,
            ProximityState::High => 4,
            ProximityState::Imminent => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDomain {
    Financial,
    LegalRegulatory,
    MedicalBiological,
    PhysicalSafety,
    PsychologicalEmotional,
    EthicalMoral,
    ReputationalSocial,
    OperationalSystemic,
    IrreversiblePersonalHarm,
    LegalAdjacentGrayZone,
    Unknown,
}

impl RiskDomain {
    pub const CRITICAL: [RiskDomain; 3] = [
        RiskDomain::LegalRegulatory,
        RiskDomain::MedicalBiological,
        RiskDomain::PhysicalSafety,
    ];

    pub fn is_critical(self) -> bool {
        Self::CRITICAL.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReversibilityClass {
    Reversible,
    Costly,
    Irreversible,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsequenceHorizon {
    Immediate,
    ShortHorizon,
    LongHorizon,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponsibilityScope {
    SelfOnly,
    ThirdParty,
    SystemicPublic,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeClass {
    Informational,
    Transactional,
    Relational,
    Physical,
    Financial,
    Legal,
    Medical,
    Reputational,
    Systemic,
    Unknown,
}

/// Where `explicit_unknown_zone` entries come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownSource {
    Reversibility,
    Horizon,
    Responsibility,
    Domain,
    Proximity,
    Outcome,
    Generic,
}

// --- ControlPlan enums --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAction {
    AnswerAllowed,
    AskOneQuestion,
    Refuse,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RigorLevel {
    Minimal,
    Guarded,
    Structured,
    Enforced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrictionPosture {
    None,
    SoftPause,
    HardPause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureState {
    Open,
    Closing,
    Closed,
    UserTerminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitiativeBudget {
    None,
    Once,
    StrictOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalCategory {
    None,
    RiskRefusal,
    CapabilityRefusal,
    GovernanceRefusal,
    EpistemicRefusal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionClass {
    SafetyLegal,
    Irreversibility,
    Responsibility,
    ConstraintGap,
    IntentAmbiguity,
    FallbackInformational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClarificationReason {
    CriticalDomainMediumConfidence,
    CriticalDomainLowConfidence,
    IrreversibleWithUnknowns,
    HighProximityUnknowns,
    None,
}

// --- OutputPlan enums ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputAction {
    Answer,
    AskOneQuestion,
    Refuse,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionPosture {
    Baseline,
    Guarded,
    Constrained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RigorDisclosureLevel {
    None,
    Light,
    Standard,
    Enforced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceSignalingLevel {
    Explicit,
    Guarded,
    Hedged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssumptionSurfacingMode {
    None,
    Light,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownDisclosureMode {
    None,
    Light,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerbosityCap {
    Terse,
    Normal,
    Detailed,
}

impl VerbosityCap {
    pub fn char_limit(self) -> usize {
        match self {
            VerbosityCap::Terse => 220,
            VerbosityCap::Normal => 600,
            VerbosityCap::Detailed => 1200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalExplanationMode {
    Brief,
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureRenderingMode {
    Silence,
    ConfirmClosure,
    BriefSummaryAndStop,
}

// --- Deep-think enums ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementTier {
    Free,
    Pro,
    Max,
}

impl EntitlementTier {
    pub fn pass_cap(self) -> u8 {
        match self {
            EntitlementTier::Free => 0,
            EntitlementTier::Pro => 3,
            EntitlementTier::Max => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassType {
    Refine,
    Counterarg,
    StressTest,
    Alternatives,
    Regret,
}

/// Fixed priority ladder, highest first. Index is the priority rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    InternalInconsistency,
    Abuse,
    EntitlementCap,
    BreakerTripped,
    BudgetExhausted,
    Timeout,
    ValidationFail,
    PassLimitReached,
    SuccessCompleted,
}

impl StopReason {
    /// Lower value = higher priority. Mirrors the fixed ladder in order.
    pub const PRIORITY: [StopReason; 9] = [
        StopReason::InternalInconsistency,
        StopReason::Abuse,
        StopReason::EntitlementCap,
        StopReason::BreakerTripped,
        StopReason::BudgetExhausted,
        StopReason::Timeout,
        StopReason::ValidationFail,
        StopReason::PassLimitReached,
        StopReason::SuccessCompleted,
    ];

    pub fn priority_rank(self) -> usize {
        Self::PRIORITY.iter().position(|r| *r == self).expect("closed enum")
    }

    /// Picks the highest-priority reason among those triggered.
    pub fn highest(triggered: &[StopReason]) -> Option<StopReason> {
        triggered.iter().copied().min_by_key(|r| r.priority_rank())
    }

    pub fn is_downgrade(self) -> bool {
        !matches!(self, StopReason::SuccessCompleted)
    }
}

// --- Bound constants (§6, §4.4, §4.8) ------------------------------------

pub const MAX_ANSWER_CHARS: usize = 1200;
pub const MAX_RATIONALE_CHARS: usize = 600;
pub const MAX_CLARIFY_QUESTION_CHARS: usize = 300;
pub const MAX_ALTERNATIVE_CHARS: usize = 200;
pub const MAX_ALTERNATIVES_COUNT: usize = 3;

pub const MIN_PASS_TIMEOUT_MS: u64 = 250;
pub const MIN_BUDGET_PER_PASS: u64 = 50;
pub const MAX_PASSES_EVER: u8 = 5;

pub const REGRET_MODEL_VERSION: &str = "17.7.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_priority_order_is_fixed() {
        assert_eq!(StopReason::InternalInconsistency.priority_rank(), 0);
        assert_eq!(StopReason::SuccessCompleted.priority_rank(), 8);
        assert!(StopReason::Abuse.priority_rank() < StopReason::BudgetExhausted.priority_rank());
    }

    #[test]
    fn highest_picks_most_severe() {
        let triggered = vec![StopReason::Timeout, StopReason::Abuse, StopReason::SuccessCompleted];
        assert_eq!(StopReason::highest(&triggered), Some(StopReason::Abuse));
    }

    #[test]
    fn tier_caps_match_spec() {
        assert_eq!(EntitlementTier::Free.pass_cap(), 0);
        assert_eq!(EntitlementTier::Pro.pass_cap(), 3);
        assert_eq!(EntitlementTier::Max.pass_cap(), 5);
    }

    #[test]
    fn verbosity_caps_match_spec() {
        assert_eq!(VerbosityCap::Terse.char_limit(), 220);
        assert_eq!(VerbosityCap::Normal.char_limit(), 600);
        assert_eq!(VerbosityCap::Detailed.char_limit(), 1200);
    }

    #[test]
    fn proximity_rank_is_monotonic_ladder() {
        assert!(ProximityState::Imminent.rank() > ProximityState::High.rank());
        assert!(ProximityState::High.rank() > ProximityState::Medium.rank());
        assert!(ProximityState::Medium.rank() > ProximityState::Low.rank());
        assert!(ProximityState::Low.rank() > ProximityState::VeryLow.rank());
    }
}
