//! Request-id assignment, CORS, and the Content-Length strip mandated for
//! every response this service emits.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const UX_STATE_HEADER: HeaderName = HeaderName::from_static("x-ux-state");
pub const COOLDOWN_HEADER: HeaderName = HeaderName::from_static("x-cooldown-seconds");

/// A request id is accepted from the client only if every character is a
/// hex digit or hyphen and the whole thing is 64 characters or shorter;
/// otherwise a fresh UUIDv4 is generated.
fn is_safe_client_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= 64
        && value.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_safe_client_request_id(v))
        .map(str::to_string);

    let request_id = incoming.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.headers_mut().remove(axum::http::header::CONTENT_LENGTH);

    response
}

pub fn build_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let origins: Vec<HeaderValue> =
        allowed_origins.iter().filter_map(|origin| HeaderValue::from_str(origin).ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, REQUEST_ID_HEADER])
        .expose_headers([REQUEST_ID_HEADER, UX_STATE_HEADER, COOLDOWN_HEADER])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_request_id_with_unsafe_characters() {
        assert!(!is_safe_client_request_id("../etc/passwd"));
        assert!(!is_safe_client_request_id("abc def"));
    }

    #[test]
    fn accepts_hex_and_hyphen_request_id() {
        assert!(is_safe_client_request_id("abc123-def456"));
    }

    #[test]
    fn rejects_overlong_request_id() {
        let long = "a".repeat(65);
        assert!(!is_safe_client_request_id(&long));
    }
}
