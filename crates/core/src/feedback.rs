//! User feedback entities: reviews of titles and comments on reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{CommentId, ReviewId, TitleId, UserId};
use crate::score::Score;

/// Author as exposed on feedback (identity + public username).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
}

/// A user's scored review of a title.
///
/// At most one review exists per `(author, title)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub title_id: TitleId,
    pub author: AuthorRef,
    pub score: Score,
    pub text: Option<String>,
    /// Assigned by the store on insert; never changed afterwards.
    pub pub_date: DateTime<Utc>,
}

/// Input for a new review. Author and title come from the request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub title_id: TitleId,
    pub author_id: UserId,
    pub score: Score,
    pub text: Option<String>,
}

/// A comment attached to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// `None` only for rows whose review linkage was never set.
    pub review_id: Option<ReviewId>,
    pub author: AuthorRef,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Input for a new comment. Author and review come from the request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub review_id: ReviewId,
    pub author_id: UserId,
    pub text: String,
}

/// Comment bodies are required and may not be blank.
pub fn validate_comment_text(raw: &str) -> DomainResult<String> {
    if raw.trim().is_empty() {
        return Err(DomainError::field("text", "This field may not be blank."));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_must_not_be_blank() {
        assert!(validate_comment_text("   ").is_err());
        assert_eq!(validate_comment_text("nice").unwrap(), "nice");
    }
}
