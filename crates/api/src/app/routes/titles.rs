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

use yamdb_infra::TitleFilter;

use crate::app::dto::{PageParams, Paginated, TitlePayload, TitleView, TitleWriteView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{catalog_policy, guard};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_titles).post(create_title))
        .route(
            "/:title_id",
            get(get_title)
                .put(replace_title)
                .patch(update_title)
                .delete(delete_title),
        )
}

pub async fn list_titles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    page: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<TitleFilter>, QueryRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Query(page) = page?;
    let Query(filter) = filter?;

    let titles = services.store.list_titles(&filter, page.pagination()).await?;
    Ok(Json(Paginated::from_page(titles, |t| TitleView::from(&t))).into_response())
}

pub async fn create_title(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    body: Result<Json<TitlePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Json(body) = body?;
    let new = services.resolve_title(body.into_draft(None)?).await?;

    let title = services.store.create_title(new).await?;
    tracing::info!(title_id = title.id.get(), "title created");
    Ok((StatusCode::CREATED, Json(TitleWriteView::from(&title))).into_response())
}

pub async fn get_title(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Path(id) = id?;

    let title = services.title(id).await?;
    Ok(Json(TitleView::from(&title)).into_response())
}

pub async fn replace_title(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TitlePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_title(services, ctx, method, id, body, false).await
}

pub async fn update_title(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TitlePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    write_title(services, ctx, method, id, body, true).await
}

async fn write_title(
    services: Arc<AppServices>,
    ctx: CallerContext,
    method: Method,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TitlePayload>, JsonRejection>,
    partial: bool,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Path(id) = id?;
    let existing = services.title(id).await?;
    let Json(body) = body?;

    let draft = body.into_draft(partial.then_some(&existing.title))?;
    let new = services.resolve_title(draft).await?;
    let title = services.store.replace_title(existing.title.id, new).await?;
    tracing::info!(title_id = title.id.get(), partial, "title updated");
    Ok(Json(TitleWriteView::from(&title)).into_response())
}

pub async fn delete_title(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    method: Method,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Path(id) = id?;
    let title = services.title(id).await?;

    if !services.store.delete_title(title.title.id).await? {
        return Err(ApiError::NotFound("title"));
    }
    tracing::info!(title_id = id, "title deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
