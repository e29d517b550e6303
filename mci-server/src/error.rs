//! The single boundary error type: every internal failure is translated
//! here into a closed `failure_type` code and a sanitized reason, never the
//! original message or a stack trace.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const MAX_REASON_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    InvalidBody,
    UnsupportedMediaType,
    RateLimited,
    InvariantViolation,
    ValidationFail,
    BudgetExhausted,
    Timeout,
    BreakerTripped,
    EntitlementCap,
    Abuse,
    ProviderError,
    NonJson,
    SchemaMismatch,
    ForbiddenContent,
    ContractViolation,
    InternalInconsistency,
}

impl FailureType {
    fn code(self) -> &'static str {
        match self {
            FailureType::InvalidBody => "INVALID_BODY",
            FailureType::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            FailureType::RateLimited => "RATE_LIMITED",
            FailureType::InvariantViolation => "INVARIANT_VIOLATION",
            FailureType::ValidationFail => "VALIDATION_FAIL",
            FailureType::BudgetExhausted => "BUDGET_EXHAUSTED",
            FailureType::Timeout => "TIMEOUT",
            FailureType::BreakerTripped => "BREAKER_TRIPPED",
            FailureType::EntitlementCap => "ENTITLEMENT_CAP",
            FailureType::Abuse => "ABUSE",
            FailureType::ProviderError => "PROVIDER_ERROR",
            FailureType::NonJson => "NON_JSON",
            FailureType::SchemaMismatch => "SCHEMA_MISMATCH",
            FailureType::ForbiddenContent => "FORBIDDEN_CONTENT",
            FailureType::ContractViolation => "CONTRACT_VIOLATION",
            FailureType::InternalInconsistency => "INTERNAL_INCONSISTENCY",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            FailureType::InvalidBody => StatusCode::BAD_REQUEST,
            FailureType::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            FailureType::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            FailureType::BudgetExhausted | FailureType::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            FailureType::BreakerTripped | FailureType::EntitlementCap | FailureType::Abuse => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Strips common secret patterns (`sk-…` keys, `Authorization: Bearer …`
/// headers) and truncates to the bound before a reason ever leaves the
/// process.
fn sanitize_reason(raw: &str) -> String {
    let redacted = redact_secrets(raw);
    if redacted.chars().count() <= MAX_REASON_CHARS {
        redacted
    } else {
        redacted.chars().take(MAX_REASON_CHARS).collect()
    }
}

fn redact_secrets(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_inclusive(char::is_whitespace) {
        let trimmed = word.trim_end();
        if trimmed.starts_with("sk-") || trimmed.to_ascii_lowercase().starts_with("bearer") {
            out.push_str("[REDACTED]");
            out.push_str(&word[trimmed.len()..]);
        } else {
            out.push_str(word);
        }
    }
    out
}

pub struct ApiError {
    failure_type: FailureType,
    reason: String,
    request_id: String,
}

impl ApiError {
    pub fn new(failure_type: FailureType, reason: impl Into<String>, request_id: impl Into<String>) -> Self {
        ApiError { failure_type, reason: sanitize_reason(&reason.into()), request_id: request_id.into() }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    failure_type: &'static str,
    failure_reason: String,
    request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.failure_type.status();
        let body = ErrorBody {
            ok: false,
            failure_type: self.failure_type.code(),
            failure_reason: self.reason,
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_tokens() {
        let cleaned = redact_secrets("call failed, Authorization: Bearer sk-abc123xyz was rejected");
        assert!(!cleaned.contains("sk-abc123xyz"));
    }

    #[test]
    fn truncates_to_bound() {
        let long = "x".repeat(500);
        let cleaned = sanitize_reason(&long);
        assert_eq!(cleaned.chars().count(), MAX_REASON_CHARS);
    }
}
