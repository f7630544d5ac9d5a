use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use yamdb_core::NewReview;

use crate::app::dto::{PageParams, Paginated, ReviewPayload, ReviewView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{feedback_policy, guard, guard_object};
use crate::context::CallerContext;

/// Mounted under `/titles`.
pub fn router() -> Router {
    Router::new()
        .route("/:title_id/reviews", get(list_reviews).post(create_review))
        .route(
            "/:title_id/reviews/:review_id",
            get(get_review)
                .put(replace_review)
                .patch(update_review)
                .delete(delete_review),
        )
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    title_id: Result<Path<i64>, PathRejection>,
    page: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let Path(title_id) = title_id?;
    let title = services.title(title_id).await?;
    let Query(page) = page?;

    let reviews = services
        .store
        .list_reviews(title.title.id, page.pagination())
        .await?;
    Ok(Json(Paginated::from_page(reviews, |r| ReviewView::from(&r))).into_response())
}

/// Author comes from the caller and title from the path; a missing title is
/// reported before the body is looked at.
pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    title_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let author_id = ctx.user_id().ok_or(ApiError::Forbidden)?;
    let Path(title_id) = title_id?;
    let title = services.title(title_id).await?;
    let Json(body) = body?;
    let (score, text) = body.validate(None)?;

    if services
        .store
        .review_by_author(title.title.id, author_id)
        .await?
        .is_some()
    {
        return Err(ApiError::field(
            yamdb_core::ValidationErrors::NON_FIELD,
            "You have already reviewed this title.",
        ));
    }

    // The store's unique constraint still decides concurrent submissions.
    let review = services
        .store
        .create_review(NewReview {
            title_id: title.title.id,
            author_id,
            score,
            text,
        })
        .await?;
    tracing::info!(review_id = review.id.get(), title_id, "review created");
    Ok((StatusCode::CREATED, Json(ReviewView::from(&review))).into_response())
}

pub async fn get_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let Path((title_id, review_id)) = ids?;

    let review = services.review(title_id, review_id).await?;
    Ok(Json(ReviewView::from(&review)).into_response())
}

pub async fn replace_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_review(services, ctx, method, ids, body, false).await
}

pub async fn update_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_review(services, ctx, method, ids, body, true).await
}

async fn write_review(
    services: Arc<AppServices>,
    ctx: CallerContext,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
    partial: bool,
) -> Result<Response, ApiError> {
    let policy = feedback_policy();
    guard(&policy, &ctx, &method)?;
    let Path((title_id, review_id)) = ids?;
    let review = services.review(title_id, review_id).await?;
    guard_object(&policy, &ctx, &method, review.author.id)?;
    let Json(body) = body?;

    let (score, text) = body.validate(partial.then_some(&review))?;
    let review = services.store.update_review(review.id, score, text).await?;
    tracing::info!(review_id = review.id.get(), partial, "review updated");
    Ok(Json(ReviewView::from(&review)).into_response())
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, ApiError> {
    let policy = feedback_policy();
    guard(&policy, &ctx, &method)?;
    let Path((title_id, review_id)) = ids?;
    let review = services.review(title_id, review_id).await?;
    guard_object(&policy, &ctx, &method, review.author.id)?;

    if !services.store.delete_review(review.id).await? {
        return Err(ApiError::NotFound("review"));
    }
    tracing::info!(review_id, deleted_by = ?ctx.user_id().map(|id| id.get()), "review deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
