//! Canonical model invocation pipeline: envelope -> invoke -> verify ->
//! deterministic fallback. No provider selection, no retries, no authority
//! over the `OutputPlan` it is handed.
//!
//! Grounded on `examples/original_source/backend/mci_backend/{model_runtime,model_invocation_pipeline}.py`.

use tracing::{instrument, warn};

use crate::domain::decision_state::DecisionState;
use crate::domain::output_plan::OutputPlan;
use crate::domain::types::OutputAction;

use super::client::{ClientError, ModelClient};
use super::envelope::{build_model_invocation_request, EnvelopeError, ModelOutputFormat};
use super::fallback::render_fallback_content;
use super::verify::{verify_and_sanitize_model_output, ModelFailureType, ModelInvocationResult};

/// Run the full model-invocation pipeline for one `OutputPlan`. Always
/// returns `ok: true` on success: a verified model candidate, or a
/// deterministic fallback if the model failed or its candidate was
/// rejected.
#[instrument(skip(user_text, decision_state, output_plan, client), fields(action = ?output_plan.action))]
pub async fn invoke_model_for_output_plan(
    user_text: &str,
    decision_state: &DecisionState,
    output_plan: &OutputPlan,
    client: &dyn ModelClient,
) -> ModelInvocationResult {
    let request = match build_model_invocation_request(user_text, output_plan) {
        Ok(r) => r,
        Err(err) => return fallback_or_fail(err, decision_state, output_plan),
    };

    let raw = client.invoke(&request).await;
    let has_explicit_unknowns = !decision_state.explicit_unknown_zone.is_empty();

    let model_result = match raw {
        Ok(text) => match request.output_format {
            ModelOutputFormat::Json => ModelInvocationResult { ok: true, output_text: None, output_json: None, failure: None }
                .with_text_awaiting_parse(text),
            ModelOutputFormat::Text => ModelInvocationResult::success_text(text),
        },
        Err(err) => client_failure(err),
    };

    let verified = verify_and_sanitize_model_output(&model_result, request.output_format, output_plan, has_explicit_unknowns);
    if verified.ok {
        return verified;
    }

    warn!(
        reason_code = verified.failure.as_ref().map(|f| f.reason_code).unwrap_or("unknown"),
        action = ?output_plan.action,
        "model output verification failed, falling back to deterministic rendering"
    );

    render_as_invocation_result(decision_state, output_plan)
}

fn client_failure(err: ClientError) -> ModelInvocationResult {
    let failure_type = match &err {
        ClientError::Request(msg) if msg.to_ascii_lowercase().contains("timeout") => ModelFailureType::Timeout,
        ClientError::Request(_) | ClientError::Status(_, _) | ClientError::Body(_) => ModelFailureType::ProviderError,
    };
    ModelInvocationResult::failure(failure_type, "PROVIDER_ERROR", err.to_string())
}

fn fallback_or_fail(err: EnvelopeError, decision_state: &DecisionState, output_plan: &OutputPlan) -> ModelInvocationResult {
    warn!(%err, "envelope construction failed before any model call, using fallback");
    render_as_invocation_result(decision_state, output_plan)
}

fn render_as_invocation_result(decision_state: &DecisionState, output_plan: &OutputPlan) -> ModelInvocationResult {
    match render_fallback_content(decision_state, output_plan) {
        Ok(content) => match output_plan.action {
            OutputAction::AskOneQuestion => {
                ModelInvocationResult::success_json(content.json.unwrap_or_default())
            }
            _ => ModelInvocationResult::success_text(content.text.unwrap_or_default()),
        },
        Err(err) => ModelInvocationResult::failure(
            ModelFailureType::ContractViolation,
            "FALLBACK_RENDER_FAILED",
            err.to_string(),
        ),
    }
}

impl ModelInvocationResult {
    /// For a JSON-format request, the raw model text IS the JSON payload to
    /// be parsed downstream by the verifier, not pre-parsed here.
    fn with_text_awaiting_parse(mut self, text: String) -> Self {
        self.ok = true;
        self.output_text = Some(text);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision_state::RiskAssessment;
    use crate::domain::output_plan::{ClosureSpec, QuestionSpec};
    use crate::domain::types::{
        AssumptionSurfacingMode, ClosureRenderingMode, ConfidenceLevel, ConfidenceSignalingLevel, ConsequenceHorizon,
        ExpressionPosture, OutcomeClass, ProximityState, ResponsibilityScope, ReversibilityClass, RigorDisclosureLevel,
        RiskDomain, UnknownDisclosureMode, VerbosityCap,
    };
    use std::collections::BTreeSet;

    struct FailingClient;

    #[async_trait::async_trait]
    impl ModelClient for FailingClient {
        async fn invoke(&self, _request: &super::super::envelope::ModelInvocationRequest) -> Result<String, ClientError> {
            Err(ClientError::Request("connection refused".into()))
        }
    }

    fn minimal_state() -> DecisionState {
        DecisionState::new(
            "dec-1",
            "trace-1",
            ProximityState::Medium,
            false,
            vec![RiskAssessment { domain: RiskDomain::Financial, confidence: ConfidenceLevel::Medium }],
            ReversibilityClass::Reversible,
            ConsequenceHorizon::ShortHorizon,
            ResponsibilityScope::SelfOnly,
            vec![OutcomeClass::Informational],
            BTreeSet::new(),
        )
        .expect("valid decision state")
    }

    fn close_plan() -> OutputPlan {
        OutputPlan {
            id: uuid::Uuid::nil(),
            action: OutputAction::Close,
            posture: ExpressionPosture::Baseline,
            rigor_disclosure: RigorDisclosureLevel::Light,
            confidence_signaling: ConfidenceSignalingLevel::Guarded,
            assumption_surfacing: AssumptionSurfacingMode::Light,
            unknown_disclosure: UnknownDisclosureMode::None,
            verbosity_cap: VerbosityCap::Terse,
            question_spec: None,
            refusal_spec: None,
            closure_spec: Some(ClosureSpec { rendering_mode: ClosureRenderingMode::ConfirmClosure }),
        }
    }

    #[tokio::test]
    async fn client_failure_falls_back_to_deterministic_rendering() {
        let state = minimal_state();
        let plan = close_plan();
        let result = invoke_model_for_output_plan("please close this out", &state, &plan, &FailingClient).await;
        assert!(result.ok);
        assert_eq!(result.output_text.unwrap(), "Got it. Closing out.");
    }

    #[tokio::test]
    async fn empty_user_text_falls_back_without_calling_client() {
        let state = minimal_state();
        let mut plan = close_plan();
        plan.question_spec = Some(QuestionSpec {
            question_class: crate::domain::types::QuestionClass::FallbackInformational,
            priority_reason: "x".into(),
        });
        let result = invoke_model_for_output_plan("", &state, &plan, &FailingClient).await;
        assert!(result.ok);
    }
}
