use axum::Router;

use yamdb_core::ReferenceKind;

pub mod auth;
pub mod comments;
pub mod reference;
pub mod reviews;
pub mod system;
pub mod titles;
pub mod users;

/// Router for every `/v1` endpoint.
///
/// Each handler applies its own policy, since most resources mix public
/// reads with restricted writes.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/categories", reference::router(ReferenceKind::Category))
        .nest("/genres", reference::router(ReferenceKind::Genre))
        .nest(
            "/titles",
            titles::router()
                .merge(reviews::router())
                .merge(comments::router()),
        )
}
