use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::Instrument;

use yamdb_auth::{Caller, JwtValidator, Principal};
use yamdb_infra::Store;

use crate::app::errors::ApiError;
use crate::context::{CallerContext, RequestId};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wrap each request in a span carrying a fresh request id.
pub async fn trace_requests(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id);

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );

    async move {
        let started = Instant::now();
        let mut res = next.run(req).await;
        tracing::info!(
            status = res.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            res.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        res
    }
    .instrument(span)
    .await
}

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: Arc<dyn Store>,
}

/// Resolve the bearer token (if any) into a [`CallerContext`].
///
/// No `Authorization` header means an anonymous caller; a header that does not
/// carry a valid token for an active account is rejected with 401.
pub async fn identify_caller(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = match resolve_caller(&state, req.headers()).await {
        Ok(caller) => caller,
        Err(err) => return err.into_response(),
    };

    if let Caller::Authenticated(principal) = &caller {
        tracing::Span::current().record("user_id", principal.user_id.get());
    }
    req.extensions_mut().insert(CallerContext::new(caller));

    next.run(req).await
}

async fn resolve_caller(state: &AuthState, headers: &HeaderMap) -> Result<Caller, ApiError> {
    let Some(token) = extract_bearer(headers)? else {
        return Ok(Caller::Anonymous);
    };

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthenticated("given token not valid".to_string())
    })?;

    let user = state
        .store
        .user_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthenticated("user not found or inactive".to_string()))?;

    Ok(Caller::Authenticated(Principal::from(&user)))
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let invalid = || ApiError::Unauthenticated("invalid authorization header".to_string());

    let header = header.to_str().map_err(|_| invalid())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(invalid)?.trim();
    if token.is_empty() {
        return Err(invalid());
    }

    Ok(Some(token))
}
