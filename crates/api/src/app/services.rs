//! Application services shared by all handlers.
//!
//! Holds the store, mailer and credential issuers, plus the lookups and
//! workflows that several routes share (path resolution, the email-code flow).

use std::sync::Arc;

use chrono::Utc;

use yamdb_auth::{CodeError, ConfirmationCodes, Hs256Jwt, JwtIssuer, NewUser, User, Username};
use yamdb_core::{
    Comment, CommentId, Email, NewTitle, RatedTitle, ReferenceId, ReferenceKind, Review, ReviewId,
    TitleId, ValidationErrors,
};
use yamdb_infra::{Constraint, EmailMessage, Mailer, Store, StoreError};

use crate::app::dto::TitleDraft;
use crate::app::errors::ApiError;
use crate::config::ApiConfig;
use crate::middleware::AuthState;

/// Upper bound on `name`, `name2`, `name3`, ... attempts when deriving a username.
const MAX_USERNAME_ATTEMPTS: usize = 100;

pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub jwt: Arc<Hs256Jwt>,
    pub codes: ConfirmationCodes,
    pub email_from: String,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: &ApiConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            store,
            mailer,
            jwt: Arc::new(Hs256Jwt::new(secret, config.access_token_ttl)),
            codes: ConfirmationCodes::new(secret, config.confirmation_code_ttl),
            email_from: config.email_from.clone(),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt: self.jwt.clone(),
            store: self.store.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Email-code flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Find or register the account for `email` and mail it a fresh code.
    ///
    /// Delivery failures are logged and otherwise ignored.
    pub async fn request_code(&self, email: &Email) -> Result<User, ApiError> {
        let user = self.find_or_register(email).await?;
        let code = self.codes.issue(&user, Utc::now())?;

        let message = EmailMessage {
            from: self.email_from.clone(),
            to: user.email.as_str().to_string(),
            subject: "YaMDb confirmation code".to_string(),
            body: format!(
                "Hello, {}!\n\nYour confirmation code: {code}\n\nExchange it for an access token at /v1/auth/token.",
                user.username
            ),
        };
        match self.mailer.send(&message) {
            Ok(()) => tracing::info!(user_id = user.id.get(), "confirmation code issued"),
            Err(e) => tracing::warn!(user_id = user.id.get(), error = %e, "confirmation mail not delivered"),
        }
        Ok(user)
    }

    /// Exchange a confirmation code for a bearer token.
    ///
    /// Stamps `last_login` only if no other redemption moved it since the
    /// account was read, which invalidates every other outstanding code.
    pub async fn redeem_code(&self, email: &Email, code: &str) -> Result<String, ApiError> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| ApiError::field("email", "No account is registered with this email."))?;
        if !user.is_active {
            return Err(ApiError::field("email", "This account is inactive."));
        }

        let now = Utc::now();
        if let Err(e) = self.codes.verify(&user, code, now) {
            tracing::warn!(user_id = user.id.get(), reason = %e, "confirmation code rejected");
            return Err(e.into());
        }

        // A concurrent redemption already moved the stamp this code was bound to.
        if !self.store.record_login(user.id, user.last_login, now).await? {
            tracing::warn!(user_id = user.id.get(), "confirmation code already redeemed");
            return Err(CodeError::Mismatch.into());
        }

        let token = self
            .jwt
            .issue(user.id, now)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))?;
        tracing::info!(user_id = user.id.get(), "access token issued");
        Ok(token)
    }

    async fn find_or_register(&self, email: &Email) -> Result<User, ApiError> {
        if let Some(user) = self.store.user_by_email(email).await? {
            return Ok(user);
        }

        let base = Username::from_email(email);
        for candidate in base.candidates().take(MAX_USERNAME_ATTEMPTS) {
            if self.store.user_by_username(candidate.as_str()).await?.is_some() {
                continue;
            }
            match self
                .store
                .create_user(NewUser::with_random_password(email.clone(), candidate))
                .await
            {
                Ok(user) => {
                    tracing::info!(user_id = user.id.get(), "account registered");
                    return Ok(user);
                }
                // Lost a race on the username; try the next suffix.
                Err(StoreError::Unique(Constraint::UserUsername)) => continue,
                // Lost a race on the email; the other request created the account.
                Err(StoreError::Unique(Constraint::UserEmail)) => {
                    return self
                        .store
                        .user_by_email(email)
                        .await?
                        .ok_or(ApiError::NotFound("user"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::field(
            "email",
            "Could not derive a free username for this email.",
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Path resolution (404 when a segment does not resolve)
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn user(&self, username: &str) -> Result<User, ApiError> {
        self.store
            .user_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("user"))
    }

    pub async fn title(&self, id: i64) -> Result<RatedTitle, ApiError> {
        self.store
            .title_by_id(TitleId::new(id))
            .await?
            .ok_or(ApiError::NotFound("title"))
    }

    /// Review `review_id`, which must belong to title `title_id`.
    pub async fn review(&self, title_id: i64, review_id: i64) -> Result<Review, ApiError> {
        let title = self.title(title_id).await?;
        self.store
            .review_in_title(title.title.id, ReviewId::new(review_id))
            .await?
            .ok_or(ApiError::NotFound("review"))
    }

    pub async fn comment(&self, title_id: i64, review_id: i64, comment_id: i64) -> Result<Comment, ApiError> {
        let review = self.review(title_id, review_id).await?;
        self.store
            .comment_in_review(review.id, CommentId::new(comment_id))
            .await?
            .ok_or(ApiError::NotFound("comment"))
    }

    /// Resolve the slugs of a title draft into reference ids.
    ///
    /// Unknown slugs are reported as validation errors on `category`/`genre`.
    pub async fn resolve_title(&self, draft: TitleDraft) -> Result<NewTitle, ApiError> {
        let mut errors = ValidationErrors::new();

        let category = match draft.category.as_deref() {
            Some(slug) => match self.store.reference_by_slug(ReferenceKind::Category, slug).await? {
                Some(entry) => Some(entry.id),
                None => {
                    errors.add("category", format!("Object with slug={slug} does not exist."));
                    None
                }
            },
            None => None,
        };

        let mut genres: Vec<ReferenceId> = Vec::with_capacity(draft.genres.len());
        for slug in &draft.genres {
            match self.store.reference_by_slug(ReferenceKind::Genre, slug).await? {
                Some(entry) => genres.push(entry.id),
                None => errors.add("genre", format!("Object with slug={slug} does not exist.")),
            }
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewTitle {
            name: draft.name,
            year: draft.year,
            description: draft.description,
            category,
            genres,
        })
    }
}
