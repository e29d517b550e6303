//! Deep-think engine: drives the router's pass plan to completion or to a
//! downgrade, enforcing the fixed stop-reason priority ladder.
//!
//! Grounded on `examples/original_source/backend/app/deepthink/engine.py`.

use tracing::{instrument, warn};

use crate::deepthink::decision::Decision;
use crate::deepthink::patch::apply_delta;
use crate::deepthink::passes::{run_pass, PassContext};
use crate::deepthink::router::Plan;
use crate::deepthink::validator::validate_delta;
use crate::domain::types::{PassType, StopReason, MAX_PASSES_EVER};
use crate::telemetry::{build_chat_summary_event, compute_decision_signature, PassSummary, StableInputs};

/// Clock- and breaker-carrying execution context, injected rather than read
/// from any global, per the no-hidden-state discipline that governs every
/// stage of this pipeline.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub request_text: String,
    pub elapsed_ms: u64,
    pub budget_units_remaining: i64,
    pub breaker_tripped: bool,
    pub abuse_blocked: bool,
}

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub final_decision: Decision,
    pub pass_count_executed: usize,
    pub stop_reason: StopReason,
    pub downgraded: bool,
    pub validator_failures: u8,
    pub decision_signature: String,
    pub telemetry_event: serde_json::Value,
}

fn check_stop_conditions(ctx: &EngineContext, plan: &Plan, validator_strikes: u8, passes_executed: usize) -> Option<StopReason> {
    if ctx.abuse_blocked {
        return Some(StopReason::Abuse);
    }
    if ctx.breaker_tripped {
        return Some(StopReason::BreakerTripped);
    }
    if ctx.budget_units_remaining <= 0 {
        return Some(StopReason::BudgetExhausted);
    }
    let total_timeout_ms: u64 = plan.per_pass_timeout_ms.iter().sum();
    if ctx.elapsed_ms >= total_timeout_ms {
        return Some(StopReason::Timeout);
    }
    if validator_strikes >= 2 {
        return Some(StopReason::ValidationFail);
    }
    if passes_executed >= MAX_PASSES_EVER as usize {
        return Some(StopReason::PassLimitReached);
    }
    None
}

fn stable_inputs(ctx: &EngineContext, plan: &Plan) -> StableInputs {
    StableInputs {
        breaker_tripped: Some(ctx.breaker_tripped),
        abuse_blocked: Some(ctx.abuse_blocked),
        total_budget_units: Some(plan.per_pass_budget.iter().sum()),
        total_timeout_ms: Some(plan.per_pass_timeout_ms.iter().sum()),
        ..Default::default()
    }
}

fn finish(
    final_decision: Decision,
    stop_reason: StopReason,
    downgraded: bool,
    validator_failures: u8,
    pass_summaries: Vec<PassSummary>,
    applied_deltas: Vec<crate::deepthink::decision::DecisionDelta>,
    pass_plan: &[PassType],
    ctx: &EngineContext,
    plan: &Plan,
) -> EngineOutput {
    let inputs = stable_inputs(ctx, plan);
    let decision_signature = compute_decision_signature(&inputs, pass_plan, &applied_deltas, validator_failures, stop_reason);
    let telemetry_event = build_chat_summary_event(
        pass_summaries.len(),
        stop_reason,
        validator_failures,
        downgraded,
        &decision_signature,
        &pass_summaries,
    );
    EngineOutput {
        final_decision,
        pass_count_executed: pass_summaries.len(),
        stop_reason,
        downgraded,
        validator_failures,
        decision_signature,
        telemetry_event,
    }
}

/// Run the engine loop over `plan` starting from `initial_decision`. Every
/// field of the output is bit-identical for identical
/// `(initial_decision, plan, context)` and pass outcomes.
#[instrument(skip(initial_decision, plan, ctx), fields(plan_passes = plan.pass_plan.len()))]
pub fn run_engine(initial_decision: &Decision, plan: &Plan, mut ctx: EngineContext) -> EngineOutput {
    if let Some(stop_reason) = plan.stop_reason {
        return finish(initial_decision.clone(), stop_reason, true, 0, Vec::new(), Vec::new(), &plan.pass_plan, &ctx, plan);
    }

    if plan.effective_pass_count as usize > MAX_PASSES_EVER as usize {
        return finish(
            initial_decision.clone(),
            StopReason::PassLimitReached,
            true,
            0,
            Vec::new(),
            Vec::new(),
            &plan.pass_plan,
            &ctx,
            plan,
        );
    }

    let mut current_decision = initial_decision.clone();
    let mut pass_summaries = Vec::new();
    let mut applied_deltas = Vec::new();
    let mut validator_strikes: u8 = 0;
    let mut passes_executed = 0usize;

    let pass_ctx = PassContext { request_text: ctx.request_text.clone() };

    for pass_type in plan.pass_plan.iter().copied() {
        if let Some(stop_reason) = check_stop_conditions(&ctx, plan, validator_strikes, passes_executed) {
            let downgraded = stop_reason != StopReason::SuccessCompleted;
            let final_decision = if downgraded { initial_decision.clone() } else { current_decision };
            return finish(final_decision, stop_reason, downgraded, validator_strikes, pass_summaries, applied_deltas, &plan.pass_plan, &ctx, plan);
        }

        let pass_result = run_pass(pass_type, &current_decision, &pass_ctx);
        ctx.budget_units_remaining -= pass_result.cost_units as i64;

        let validation = validate_delta(&pass_result.delta, validator_strikes);
        validator_strikes = validation.total_strikes;

        if validation.downgrade {
            warn!(pass = ?pass_type, errors = ?validation.errors, "delta validation hit the 2-strikes limit");
            pass_summaries.push(PassSummary {
                pass_type,
                executed: true,
                validation_ok: false,
                patch_applied: false,
                cost_units: pass_result.cost_units,
                duration_ms: pass_result.duration_ms,
                strikes_added: validation.strikes_added,
            });
            return finish(
                initial_decision.clone(),
                StopReason::ValidationFail,
                true,
                validator_strikes,
                pass_summaries,
                applied_deltas,
                &plan.pass_plan,
                &ctx,
                plan,
            );
        }

        let mut patch_applied = false;
        if validation.ok {
            match apply_delta(&current_decision, &pass_result.delta) {
                Ok(next) => {
                    current_decision = next;
                    applied_deltas.push(pass_result.delta.clone());
                    patch_applied = true;
                }
                Err(err) => {
                    warn!(pass = ?pass_type, %err, "patch application failed, counting as a strike");
                    validator_strikes += 1;
                    if validator_strikes >= 2 {
                        pass_summaries.push(PassSummary {
                            pass_type,
                            executed: true,
                            validation_ok: false,
                            patch_applied: false,
                            cost_units: pass_result.cost_units,
                            duration_ms: pass_result.duration_ms,
                            strikes_added: 1,
                        });
                        return finish(
                            initial_decision.clone(),
                            StopReason::ValidationFail,
                            true,
                            validator_strikes,
                            pass_summaries,
                            applied_deltas,
                            &plan.pass_plan,
                            &ctx,
                            plan,
                        );
                    }
                }
            }
        }

        pass_summaries.push(PassSummary {
            pass_type,
            executed: true,
            validation_ok: validation.ok,
            patch_applied,
            cost_units: pass_result.cost_units,
            duration_ms: pass_result.duration_ms,
            strikes_added: validation.strikes_added,
        });
        passes_executed += 1;
    }

    finish(
        current_decision,
        StopReason::SuccessCompleted,
        false,
        validator_strikes,
        pass_summaries,
        applied_deltas,
        &plan.pass_plan,
        &ctx,
        plan,
    )
}
