//! Persistence boundary for accounts, catalog and feedback.
//!
//! The traits make no storage assumptions: [`InMemoryStore`] backs tests/dev and
//! [`PostgresStore`] backs production. Both enforce the same relational rules:
//! - unique account email and username, unique slug per reference kind;
//! - at most one review per `(author, title)` (a second insert fails, never upserts);
//! - deleting a category clears `Title::category`;
//! - deleting a title, review or user cascades to the dependent feedback.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use yamdb_auth::{NewUser, User};
use yamdb_core::{
    Comment, CommentId, Email, NewComment, NewReference, NewReview, NewTitle, RatedTitle,
    ReferenceEntry, ReferenceKind, Review, ReviewId, Score, Title, TitleId, UserId,
};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{Page, Pagination, ReferenceFilter, TitleFilter, UserFilter};

/// Uniqueness rules the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    UserEmail,
    UserUsername,
    ReferenceSlug,
    ReviewAuthorTitle,
}

impl Constraint {
    /// Wire field the violation is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            Constraint::UserEmail => "email",
            Constraint::UserUsername => "username",
            Constraint::ReferenceSlug => "slug",
            Constraint::ReviewAuthorTitle => "non_field_errors",
        }
    }
}

impl core::fmt::Display for Constraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Constraint::UserEmail => "users.email",
            Constraint::UserUsername => "users.username",
            Constraint::ReferenceSlug => "reference.slug",
            Constraint::ReviewAuthorTitle => "reviews.(author_id, title_id)",
        };
        f.write_str(name)
    }
}

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Unique(Constraint),

    #[error("referenced row does not exist: {0}")]
    MissingReference(&'static str),

    #[error("row not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Newest accounts first.
    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<Page<User>, StoreError>;
    /// Persist the profile fields of `user` (matched by id). `last_login` is
    /// left as stored; only [`UserStore::record_login`] moves it.
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;
    /// Set `last_login` to `at` if it still equals `expected`.
    ///
    /// Returns `false` when the account is gone or another login got there first.
    async fn record_login(
        &self,
        id: UserId,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
    /// Cascades to the user's reviews and comments.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn create_reference(&self, kind: ReferenceKind, new: NewReference) -> Result<ReferenceEntry, StoreError>;
    /// Newest entries first.
    async fn list_references(
        &self,
        kind: ReferenceKind,
        filter: &ReferenceFilter,
        page: Pagination,
    ) -> Result<Page<ReferenceEntry>, StoreError>;
    async fn reference_by_slug(&self, kind: ReferenceKind, slug: &str) -> Result<Option<ReferenceEntry>, StoreError>;
    /// Categories are detached from titles; genres are unlinked.
    async fn delete_reference(&self, kind: ReferenceKind, slug: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TitleStore: Send + Sync {
    async fn create_title(&self, new: NewTitle) -> Result<Title, StoreError>;
    async fn title_by_id(&self, id: TitleId) -> Result<Option<RatedTitle>, StoreError>;
    /// Ordered by name, annotated with the average review score.
    async fn list_titles(&self, filter: &TitleFilter, page: Pagination) -> Result<Page<RatedTitle>, StoreError>;
    async fn replace_title(&self, id: TitleId, new: NewTitle) -> Result<Title, StoreError>;
    /// Cascades to reviews and their comments.
    async fn delete_title(&self, id: TitleId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError>;
    /// Only returns the review when it belongs to `title_id`.
    async fn review_in_title(&self, title_id: TitleId, review_id: ReviewId) -> Result<Option<Review>, StoreError>;
    async fn review_by_author(&self, title_id: TitleId, author_id: UserId) -> Result<Option<Review>, StoreError>;
    /// Newest first.
    async fn list_reviews(&self, title_id: TitleId, page: Pagination) -> Result<Page<Review>, StoreError>;
    async fn update_review(&self, id: ReviewId, score: Score, text: Option<String>) -> Result<Review, StoreError>;
    /// Cascades to the review's comments.
    async fn delete_review(&self, id: ReviewId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, new: NewComment) -> Result<Comment, StoreError>;
    /// Only returns the comment when it belongs to `review_id`.
    async fn comment_in_review(&self, review_id: ReviewId, comment_id: CommentId) -> Result<Option<Comment>, StoreError>;
    /// Newest first.
    async fn list_comments(&self, review_id: ReviewId, page: Pagination) -> Result<Page<Comment>, StoreError>;
    async fn update_comment(&self, id: CommentId, text: String) -> Result<Comment, StoreError>;
    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError>;
}

/// Everything the API needs from persistence.
pub trait Store: UserStore + ReferenceStore + TitleStore + ReviewStore + CommentStore {}

impl<T> Store for T where T: UserStore + ReferenceStore + TitleStore + ReviewStore + CommentStore {}
