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

use yamdb_core::NewComment;

use crate::app::dto::{CommentPayload, CommentView, PageParams, Paginated};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{feedback_policy, guard, guard_object};
use crate::context::CallerContext;

/// Mounted under `/titles`; the review must belong to the title in the path.
pub fn router() -> Router {
    Router::new()
        .route(
            "/:title_id/reviews/:review_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/:title_id/reviews/:review_id/comments/:comment_id",
            get(get_comment)
                .put(replace_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    page: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let Path((title_id, review_id)) = ids?;
    let review = services.review(title_id, review_id).await?;
    let Query(page) = page?;

    let comments = services
        .store
        .list_comments(review.id, page.pagination())
        .await?;
    Ok(Json(Paginated::from_page(comments, |c| CommentView::from(&c))).into_response())
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let author_id = ctx.user_id().ok_or(ApiError::Forbidden)?;
    let Path((title_id, review_id)) = ids?;
    let review = services.review(title_id, review_id).await?;
    let Json(body) = body?;
    let text = body.validate(None)?;

    let comment = services
        .store
        .create_comment(NewComment {
            review_id: review.id,
            author_id,
            text,
        })
        .await?;
    tracing::info!(comment_id = comment.id.get(), review_id, "comment created");
    Ok((StatusCode::CREATED, Json(CommentView::from(&comment))).into_response())
}

pub async fn get_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64, i64)>, PathRejection>,
) -> Result<Response, ApiError> {
    guard(&feedback_policy(), &ctx, &method)?;
    let Path((title_id, review_id, comment_id)) = ids?;

    let comment = services.comment(title_id, review_id, comment_id).await?;
    Ok(Json(CommentView::from(&comment)).into_response())
}

pub async fn replace_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64, i64)>, PathRejection>,
    body: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_comment(services, ctx, method, ids, body, false).await
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64, i64)>, PathRejection>,
    body: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_comment(services, ctx, method, ids, body, true).await
}

async fn write_comment(
    services: Arc<AppServices>,
    ctx: CallerContext,
    method: Method,
    ids: Result<Path<(i64, i64, i64)>, PathRejection>,
    body: Result<Json<CommentPayload>, JsonRejection>,
    partial: bool,
) -> Result<Response, ApiError> {
    let policy = feedback_policy();
    guard(&policy, &ctx, &method)?;
    let Path((title_id, review_id, comment_id)) = ids?;
    let comment = services.comment(title_id, review_id, comment_id).await?;
    guard_object(&policy, &ctx, &method, comment.author.id)?;
    let Json(body) = body?;

    let text = body.validate(partial.then_some(&comment))?;
    let comment = services.store.update_comment(comment.id, text).await?;
    tracing::info!(comment_id = comment.id.get(), partial, "comment updated");
    Ok(Json(CommentView::from(&comment)).into_response())
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    ids: Result<Path<(i64, i64, i64)>, PathRejection>,
) -> Result<Response, ApiError> {
    let policy = feedback_policy();
    guard(&policy, &ctx, &method)?;
    let Path((title_id, review_id, comment_id)) = ids?;
    let comment = services.comment(title_id, review_id, comment_id).await?;
    guard_object(&policy, &ctx, &method, comment.author.id)?;

    if !services.store.delete_comment(comment.id).await? {
        return Err(ApiError::NotFound("comment"));
    }
    tracing::info!(comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
