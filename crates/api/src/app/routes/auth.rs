use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::app::dto::{EmailRequest, EmailResponse, TokenRequest, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/email", post(request_code))
        .route("/token", post(obtain_token))
}

/// Register (if needed) and mail a confirmation code. The response does not
/// reveal whether the account already existed.
pub async fn request_code(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let email = body.validate()?;

    services.request_code(&email).await?;

    Ok((
        StatusCode::OK,
        Json(EmailResponse {
            email: email.as_str().to_string(),
        }),
    )
        .into_response())
}

pub async fn obtain_token(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let (email, code) = body.validate()?;

    let token = services.redeem_code(&email, &code).await?;

    Ok((StatusCode::OK, Json(TokenResponse { token })).into_response())
}
