//! Categories and genres share one set of handlers; the router for each
//! carries its [`ReferenceKind`] as an extension.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};

use yamdb_core::ReferenceKind;
use yamdb_infra::ReferenceFilter;

use crate::app::dto::{PageParams, Paginated, ReferencePayload, ReferenceView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{catalog_policy, guard};
use crate::context::CallerContext;

pub fn router(kind: ReferenceKind) -> Router {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:slug", delete(delete_entry))
        .layer(Extension(kind))
}

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Extension(kind): Extension<ReferenceKind>,
    method: Method,
    page: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<ReferenceFilter>, QueryRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Query(page) = page?;
    let Query(filter) = filter?;

    let entries = services
        .store
        .list_references(kind, &filter, page.pagination())
        .await?;
    Ok(Json(Paginated::from_page(entries, |e| ReferenceView::from(&e))).into_response())
}

pub async fn create_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Extension(kind): Extension<ReferenceKind>,
    method: Method,
    body: Result<Json<ReferencePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;
    let Json(body) = body?;
    let new = body.validate()?;

    let entry = services.store.create_reference(kind, new).await?;
    tracing::info!(kind = kind.as_str(), slug = %entry.slug, "reference entry created");
    Ok((StatusCode::CREATED, Json(ReferenceView::from(&entry))).into_response())
}

pub async fn delete_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Extension(kind): Extension<ReferenceKind>,
    method: Method,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    guard(&catalog_policy(), &ctx, &method)?;

    if !services.store.delete_reference(kind, &slug).await? {
        return Err(ApiError::NotFound(kind.as_str()));
    }
    tracing::info!(kind = kind.as_str(), slug = %slug, "reference entry deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
