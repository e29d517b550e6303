//! The model invocation surface: a tool-only model sits behind a bounded
//! envelope/verify/fallback contract and never gains authority over the
//! decisions made upstream of it.

pub mod client;
pub mod envelope;
pub mod fallback;
pub mod runtime;
pub mod schema;
pub mod verify;

pub use client::{ClientError, HttpModelClient, ModelClient, ModelClientConfig};
pub use envelope::{
    build_model_invocation_request, EnvelopeError, ModelInvocationClass, ModelInvocationRequest, ModelOutputFormat,
};
pub use fallback::{annotate_disclosures, render_fallback_content, FallbackContent, FallbackError};
pub use runtime::invoke_model_for_output_plan;
pub use schema::{
    validate_answer_payload, validate_ask_payload, validate_close_payload, validate_refusal_payload, AnswerPayload,
    AskOneQuestionPayload, ClosePayload, RefusalPayload, SchemaError,
};
pub use verify::{verify_and_sanitize_model_output, ModelFailure, ModelFailureType, ModelInvocationResult};
