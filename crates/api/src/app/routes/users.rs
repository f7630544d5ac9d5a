use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use yamdb_infra::UserFilter;

use crate::app::dto::{PageParams, Paginated, UserPayload, UserView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{guard, own_profile_policy, users_policy};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/:username",
            get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    page: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<UserFilter>, QueryRejection>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let Query(page) = page?;
    let Query(filter) = filter?;

    let users = services.store.list_users(&filter, page.pagination()).await?;
    Ok(Json(Paginated::from_page(users, |u| UserView::from(&u))).into_response())
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let Json(body) = body?;
    let new = body.into_new_user()?;

    let user = services.store.create_user(new).await?;
    tracing::info!(user_id = user.id.get(), role = user.role.as_str(), "account created by admin");
    Ok((StatusCode::CREATED, Json(UserView::from(&user))).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let user = services.user(&username).await?;
    Ok(Json(UserView::from(&user)).into_response())
}

pub async fn replace_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    Path(username): Path<String>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let mut user = services.user(&username).await?;
    let Json(body) = body?;

    user.apply(body.into_full_changes()?);
    let user = services.store.update_user(&user).await?;
    Ok(Json(UserView::from(&user)).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    Path(username): Path<String>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let mut user = services.user(&username).await?;
    let Json(body) = body?;

    user.apply(body.into_changes()?);
    let user = services.store.update_user(&user).await?;
    Ok(Json(UserView::from(&user)).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    guard(&users_policy(), &ctx, &method)?;
    let user = services.user(&username).await?;

    if !services.store.delete_user(user.id).await? {
        return Err(ApiError::NotFound("user"));
    }
    tracing::info!(user_id = user.id.get(), "account deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Self-service profile
// ─────────────────────────────────────────────────────────────────────────────

pub async fn get_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
) -> Result<Response, ApiError> {
    guard(&own_profile_policy(), &ctx, &method)?;
    let user = current_user(&services, &ctx).await?;
    Ok(Json(UserView::from(&user)).into_response())
}

/// Role changes are silently dropped here; only admins change roles.
pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&own_profile_policy(), &ctx, &method)?;
    let mut user = current_user(&services, &ctx).await?;
    let Json(body) = body?;

    user.apply(body.into_changes()?.without_role());
    let user = services.store.update_user(&user).await?;
    Ok(Json(UserView::from(&user)).into_response())
}

async fn current_user(services: &AppServices, ctx: &CallerContext) -> Result<yamdb_auth::User, ApiError> {
    let id = ctx
        .user_id()
        .ok_or_else(|| ApiError::Unauthenticated("authentication credentials were not provided".to_string()))?;
    services
        .store
        .user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("user not found".to_string()))
}
