//! Bearer-token authentication for the worker queue endpoints.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::server::errors::ApiError;

/// Constant-shape check kept separate from the middleware so it can be
/// tested without building requests.
pub fn bearer_matches(header: Option<&str>, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    match header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(presented) => presented == token,
        None => false,
    }
}

pub async fn worker_auth_middleware(token: String, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !bearer_matches(header, &token) {
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}
