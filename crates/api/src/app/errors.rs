use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use yamdb_auth::{AuthzError, CodeError};
use yamdb_core::{DomainError, ValidationErrors};
use yamdb_infra::{Constraint, StoreError};

/// Every failure a handler can report.
///
/// Rendered as `{"error": <code>, "message": <text>}` plus `fields` for
/// validation failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("you do not have permission to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(fields) => validation_error(fields),
            ApiError::BadRequest(msg) => json_error(status, "bad_request", msg),
            ApiError::Unauthenticated(msg) => {
                let mut res = json_error(status, "not_authenticated", msg);
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                res
            }
            ApiError::Forbidden => json_error(status, "permission_denied", ApiError::Forbidden.to_string()),
            ApiError::NotFound(what) => json_error(status, "not_found", format!("{what} not found")),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                json_error(status, "internal_error", "internal server error")
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(fields: ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": "invalid input",
            "fields": fields,
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(fields) => ApiError::Validation(fields),
            DomainError::InvalidId(msg) => ApiError::BadRequest(msg),
            DomainError::NotFound(what) => ApiError::NotFound(what),
            DomainError::Conflict(msg) => ApiError::field(ValidationErrors::NON_FIELD, msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unique(constraint) => ApiError::field(constraint.field(), unique_message(constraint)),
            StoreError::MissingReference(what @ ("category" | "genre")) => {
                ApiError::field(what, "Object with this slug does not exist.")
            }
            StoreError::MissingReference("title") => ApiError::NotFound("title"),
            StoreError::MissingReference("review") => ApiError::NotFound("review"),
            StoreError::MissingReference(_) | StoreError::NotFound => ApiError::NotFound("object"),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

fn unique_message(constraint: Constraint) -> &'static str {
    match constraint {
        Constraint::UserEmail => "A user with that email already exists.",
        Constraint::UserUsername => "A user with that username already exists.",
        Constraint::ReferenceSlug => "An entry with this slug already exists.",
        Constraint::ReviewAuthorTitle => "You have already reviewed this title.",
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => ApiError::Unauthenticated(err.to_string()),
            AuthzError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl From<CodeError> for ApiError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::Key => ApiError::Internal(err.to_string()),
            other => ApiError::field("confirmation_code", format!("{}.", capitalize(&other.to_string()))),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("resource")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_errors() {
        let err = ApiError::from(StoreError::Unique(Constraint::ReviewAuthorTitle));
        let ApiError::Validation(fields) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            fields.get(ValidationErrors::NON_FIELD),
            Some(&["You have already reviewed this title.".to_string()][..])
        );

        assert!(matches!(
            ApiError::from(StoreError::MissingReference("title")),
            ApiError::NotFound("title")
        ));
        assert_eq!(
            ApiError::from(StoreError::Backend("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn anonymous_denial_is_401_and_authenticated_denial_is_403() {
        assert_eq!(ApiError::from(AuthzError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthzError::Forbidden).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn bad_codes_are_field_errors() {
        let err = ApiError::from(CodeError::Mismatch);
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            fields.get("confirmation_code"),
            Some(&["Confirmation code is invalid.".to_string()][..])
        );
    }
}
