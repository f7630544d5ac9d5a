//! `yamdb-core`: domain building blocks for the review platform.
//!
//! This crate contains **pure domain** types (no storage, no HTTP).

pub mod catalog;
pub mod email;
pub mod error;
pub mod feedback;
pub mod id;
pub mod score;
pub mod slug;

pub use catalog::{Category, Genre, NewReference, NewTitle, RatedTitle, ReferenceEntry, ReferenceKind, ReleaseYear, Title};
pub use email::Email;
pub use error::{DomainError, DomainResult, ValidationErrors};
pub use feedback::{AuthorRef, Comment, NewComment, NewReview, Review};
pub use id::{CommentId, ReferenceId, ReviewId, TitleId, UserId};
pub use score::Score;
pub use slug::Slug;
