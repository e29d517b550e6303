//! Deep-think router: maps tier/mode/budget/timeout/breaker signals to a
//! bounded pass plan with per-pass resource allocation.
//!
//! Hard-block cascade ordering grounded on the reference `router.py`; the
//! `if/else if` ladder style is grounded on
//! `examples/rand-loop/rlm-core/src/llm/router.rs`'s `QueryType::classify`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::types::{EntitlementTier, PassType, StopReason, MAX_PASSES_EVER, MIN_BUDGET_PER_PASS, MIN_PASS_TIMEOUT_MS};

/// Input signals consulted by the router. No text fields, per the no-clock,
/// no-global-state discipline that governs the whole pipeline.
#[derive(Debug, Clone)]
pub struct RouterInput {
    pub entitlement_tier: EntitlementTier,
    pub deepthink_enabled: bool,
    pub requested_mode: String,
    pub breaker_tripped: bool,
    pub abuse_blocked: bool,
    pub total_budget_units: u64,
    pub total_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouterPolicy {
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub effective_pass_count: u8,
    pub pass_plan: Vec<PassType>,
    pub per_pass_budget: Vec<u64>,
    pub per_pass_timeout_ms: Vec<u64>,
    pub stop_reason: Option<StopReason>,
    pub policy: RouterPolicy,
}

impl Plan {
    fn blocked(reason: StopReason, note: &str) -> Self {
        let mut policy = RouterPolicy::default();
        policy.notes.insert("block_reason".into(), note.into());
        Plan {
            effective_pass_count: 0,
            pass_plan: Vec::new(),
            per_pass_budget: Vec::new(),
            per_pass_timeout_ms: Vec::new(),
            stop_reason: Some(reason),
            policy,
        }
    }
}

fn pass_plan_template(count: u8) -> Vec<PassType> {
    match count {
        2 => vec![PassType::Refine, PassType::StressTest],
        3 => vec![PassType::Refine, PassType::Counterarg, PassType::StressTest],
        4 => vec![PassType::Refine, PassType::Counterarg, PassType::Alternatives, PassType::StressTest],
        5 => vec![
            PassType::Refine,
            PassType::Counterarg,
            PassType::StressTest,
            PassType::Alternatives,
            PassType::Regret,
        ],
        _ => Vec::new(),
    }
}

/// Fixed relative weight per pass type used for resource allocation.
fn pass_weight(pass: PassType) -> u64 {
    match pass {
        PassType::Refine => 1,
        PassType::Counterarg => 2,
        PassType::StressTest => 2,
        PassType::Alternatives => 3,
        PassType::Regret => 3,
    }
}

/// Floor-then-remainder allocation: each pass gets at least
/// `floor(total * weight / total_weight)`, clamped to the provided minimum,
/// and the remainder is distributed round-robin in plan order so that
/// `sum(allocation) == total`.
fn allocate(total: u64, plan: &[PassType], minimum: u64) -> Vec<u64> {
    if plan.is_empty() {
        return Vec::new();
    }
    let total_weight: u64 = plan.iter().map(|p| pass_weight(*p)).sum();
    let mut allocation: Vec<u64> = plan
        .iter()
        .map(|p| {
            let floor = (total * pass_weight(*p)) / total_weight;
            floor.max(minimum)
        })
        .collect();

    let allocated: u64 = allocation.iter().sum();
    if allocated >= total {
        // Minimums pushed us over budget; shrink from the back while staying
        // at or above the floor minimum per slot.
        let mut excess = allocated - total;
        for a in allocation.iter_mut().rev() {
            if excess == 0 {
                break;
            }
            let give = (*a - minimum).min(excess);
            *a -= give;
            excess -= give;
        }
    } else {
        let mut remainder = total - allocated;
        let mut i = 0;
        while remainder > 0 {
            allocation[i % allocation.len()] += 1;
            remainder -= 1;
            i += 1;
        }
    }

    allocation
}

/// Produce a deep-think plan from router input. Evaluates the hard-block
/// cascade in the fixed order named in the component design before computing
/// the effective pass count.
pub fn route(input: &RouterInput) -> Plan {
    if input.entitlement_tier.pass_cap() == 0 || !input.deepthink_enabled {
        return Plan::blocked(StopReason::EntitlementCap, "tier_cap_zero_or_disabled");
    }
    if input.abuse_blocked {
        return Plan::blocked(StopReason::Abuse, "abuse_blocked");
    }
    if input.breaker_tripped {
        return Plan::blocked(StopReason::BreakerTripped, "breaker_tripped");
    }
    if input.requested_mode != "deep" {
        return Plan::blocked(StopReason::EntitlementCap, "requested_mode_not_deep");
    }

    let tier_cap = input.entitlement_tier.pass_cap() as u64;
    let by_timeout = input.total_timeout_ms / MIN_PASS_TIMEOUT_MS;
    let by_budget = input.total_budget_units / MIN_BUDGET_PER_PASS;
    let derived = tier_cap.min(by_timeout).min(by_budget);

    if input.total_timeout_ms < 2 * MIN_PASS_TIMEOUT_MS || input.total_budget_units == 0 || derived < 2 {
        return Plan::blocked(StopReason::BudgetExhausted, "insufficient_budget_or_timeout_or_passes");
    }

    let effective_pass_count = derived.clamp(2, MAX_PASSES_EVER as u64) as u8;
    let pass_plan = pass_plan_template(effective_pass_count);

    let per_pass_budget = allocate(input.total_budget_units, &pass_plan, MIN_BUDGET_PER_PASS);
    let per_pass_timeout_ms = allocate(input.total_timeout_ms, &pass_plan, MIN_PASS_TIMEOUT_MS);

    Plan {
        effective_pass_count,
        pass_plan,
        per_pass_budget,
        per_pass_timeout_ms,
        stop_reason: None,
        policy: RouterPolicy::default(),
    }
}
