use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use yamdb_auth::user::validate_profile_text;
use yamdb_auth::{NewUser, ProfileChanges, Role, User, Username};
use yamdb_core::catalog::validate_name;
use yamdb_core::feedback::validate_comment_text;
use yamdb_core::{
    Comment, DomainError, Email, NewReference, RatedTitle, ReferenceEntry, ReleaseYear, Review,
    Score, Title, ValidationErrors,
};
use yamdb_infra::{Page, Pagination};

use crate::app::errors::ApiError;

const REQUIRED: &str = "This field is required.";

// -------------------------
// Helpers
// -------------------------

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Record a validation result under `errors`, returning the value on success.
fn collect<T>(errors: &mut ValidationErrors, result: Result<T, DomainError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DomainError::Validation(e)) => {
            errors.merge(e);
            Ok(None)
        }
        Err(other) => Err(other.into()),
    }
}

fn required<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

fn finish(errors: ValidationErrors) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

// -------------------------
// Pagination
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }
}

/// List envelope shared by every collection endpoint.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub results: Vec<T>,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            count: page.total,
            limit: page.pagination.limit,
            offset: page.pagination.offset,
            has_more: page.has_more,
            results: page.items,
        }
    }
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

impl EmailRequest {
    pub fn validate(self) -> Result<Email, ApiError> {
        let raw = self.email.ok_or_else(|| ApiError::field("email", REQUIRED))?;
        Ok(Email::parse(&raw).map_err(|e| e.for_field("email"))?)
    }
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub confirmation_code: Option<String>,
}

impl TokenRequest {
    pub fn validate(self) -> Result<(Email, String), ApiError> {
        let mut errors = ValidationErrors::new();
        let email = match required(&mut errors, "email", self.email) {
            Some(raw) => collect(&mut errors, Email::parse(&raw).map_err(|e| e.for_field("email")))?,
            None => None,
        };
        let code = required(&mut errors, "confirmation_code", self.confirmation_code)
            .filter(|code| !code.trim().is_empty());
        if code.is_none() && errors.get("confirmation_code").is_none() {
            errors.add("confirmation_code", "This field may not be blank.");
        }
        finish(errors)?;

        match (email, code) {
            (Some(email), Some(code)) => Ok((email, code)),
            _ => Err(ApiError::BadRequest("invalid token request".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            role: user.role,
        }
    }
}

/// Body of user create/update requests. Every field is optional at the wire
/// level; which ones are required depends on the verb.
#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

impl UserPayload {
    /// Partial update: only the supplied fields change.
    pub fn into_changes(self) -> Result<ProfileChanges, ApiError> {
        let mut errors = ValidationErrors::new();

        let username = match self.username.as_deref() {
            Some(raw) => collect(&mut errors, Username::parse(raw))?,
            None => None,
        };
        let email = match self.email.as_deref() {
            Some(raw) => collect(&mut errors, Email::parse(raw).map_err(|e| e.for_field("email")))?,
            None => None,
        };
        let role = match self.role.as_deref() {
            Some(raw) => collect(&mut errors, raw.parse::<Role>())?,
            None => None,
        };
        collect(
            &mut errors,
            validate_profile_text(self.first_name.as_deref(), self.last_name.as_deref(), self.bio.as_deref()),
        )?;
        finish(errors)?;

        Ok(ProfileChanges {
            username,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role,
        })
    }

    /// Full update / create: username and email must be present.
    pub fn into_full_changes(self) -> Result<ProfileChanges, ApiError> {
        let mut errors = ValidationErrors::new();
        required(&mut errors, "username", self.username.as_ref());
        required(&mut errors, "email", self.email.as_ref());
        if !errors.is_empty() {
            // Report the missing fields together with any other problems.
            if let Err(ApiError::Validation(more)) = self.into_changes() {
                errors.merge(more);
            }
            return Err(ApiError::Validation(errors));
        }
        self.into_changes()
    }

    pub fn into_new_user(self) -> Result<NewUser, ApiError> {
        let changes = self.into_full_changes()?;
        let (Some(email), Some(username)) = (changes.email, changes.username) else {
            return Err(ApiError::BadRequest("username and email are required".to_string()));
        };

        let mut new = NewUser::with_random_password(email, username);
        new.first_name = changes.first_name.unwrap_or_default();
        new.last_name = changes.last_name.unwrap_or_default();
        new.bio = changes.bio.unwrap_or_default();
        new.role = changes.role.unwrap_or_default();
        Ok(new)
    }
}

// -------------------------
// Categories / genres
// -------------------------

#[derive(Debug, Serialize)]
pub struct ReferenceView {
    pub name: String,
    pub slug: String,
}

impl From<&ReferenceEntry> for ReferenceView {
    fn from(entry: &ReferenceEntry) -> Self {
        Self {
            name: entry.name.clone(),
            slug: entry.slug.as_str().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReferencePayload {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl ReferencePayload {
    pub fn validate(self) -> Result<NewReference, ApiError> {
        let mut errors = ValidationErrors::new();
        let name = required(&mut errors, "name", self.name);
        let slug = required(&mut errors, "slug", self.slug);
        match (name, slug) {
            (Some(name), Some(slug)) => Ok(NewReference::new(&name, &slug)?),
            (name, slug) => {
                // Still report format problems on whichever field was supplied.
                if let Some(name) = name {
                    collect(&mut errors, validate_name(&name))?;
                }
                if let Some(slug) = slug {
                    collect(&mut errors, yamdb_core::Slug::parse(&slug))?;
                }
                Err(ApiError::Validation(errors))
            }
        }
    }
}

// -------------------------
// Titles
// -------------------------

/// Read form: nested category/genres plus the computed rating.
#[derive(Debug, Serialize)]
pub struct TitleView {
    pub id: i64,
    pub name: String,
    pub year: u16,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<ReferenceView>,
    pub category: Option<ReferenceView>,
}

impl From<&RatedTitle> for TitleView {
    fn from(rated: &RatedTitle) -> Self {
        let title = &rated.title;
        Self {
            id: title.id.get(),
            name: title.name.clone(),
            year: title.year.get(),
            rating: rated.rating,
            description: title.description.clone(),
            genre: title.genres.iter().map(ReferenceView::from).collect(),
            category: title.category.as_ref().map(ReferenceView::from),
        }
    }
}

/// Write form echo: category and genres as slugs.
#[derive(Debug, Serialize)]
pub struct TitleWriteView {
    pub id: i64,
    pub name: String,
    pub year: u16,
    pub description: String,
    pub genre: Vec<String>,
    pub category: Option<String>,
}

impl From<&Title> for TitleWriteView {
    fn from(title: &Title) -> Self {
        Self {
            id: title.id.get(),
            name: title.name.clone(),
            year: title.year.get(),
            description: title.description.clone(),
            genre: title.genres.iter().map(|g| g.slug.as_str().to_string()).collect(),
            category: title.category.as_ref().map(|c| c.slug.as_str().to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TitlePayload {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub genre: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
}

/// Validated title fields with category/genres still expressed as slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDraft {
    pub name: String,
    pub year: ReleaseYear,
    pub description: String,
    pub category: Option<String>,
    pub genres: Vec<String>,
}

impl TitlePayload {
    /// Validate against `existing` (PATCH) or from scratch (POST/PUT).
    pub fn into_draft(self, existing: Option<&Title>) -> Result<TitleDraft, ApiError> {
        let mut errors = ValidationErrors::new();

        let name = match (self.name, existing) {
            (Some(raw), _) => collect(&mut errors, validate_name(&raw))?,
            (None, Some(title)) => Some(title.name.clone()),
            (None, None) => required(&mut errors, "name", None),
        };
        let year = match (self.year, existing) {
            (Some(raw), _) => collect(&mut errors, ReleaseYear::new(raw))?,
            (None, Some(title)) => Some(title.year),
            (None, None) => required(&mut errors, "year", None),
        };
        let description = match (self.description, existing) {
            (Some(text), _) => text,
            (None, Some(title)) => title.description.clone(),
            (None, None) => String::new(),
        };
        let category = match (self.category, existing) {
            (Some(slug), _) => slug,
            (None, Some(title)) => title.category.as_ref().map(|c| c.slug.as_str().to_string()),
            (None, None) => None,
        };
        let genres = match (self.genre, existing) {
            (Some(slugs), _) => slugs.unwrap_or_default(),
            (None, Some(title)) => title.genres.iter().map(|g| g.slug.as_str().to_string()).collect(),
            (None, None) => Vec::new(),
        };
        finish(errors)?;

        match (name, year) {
            (Some(name), Some(year)) => Ok(TitleDraft {
                name,
                year,
                description,
                category,
                genres,
            }),
            _ => Err(ApiError::BadRequest("invalid title".to_string())),
        }
    }
}

// -------------------------
// Reviews / comments
// -------------------------

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub id: i64,
    pub text: Option<String>,
    pub author: String,
    pub score: u8,
    pub pub_date: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.get(),
            text: review.text.clone(),
            author: review.author.username.clone(),
            score: review.score.get(),
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewPayload {
    /// Kept raw so a wrong type is reported against `score`, not the whole body.
    pub score: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub text: Option<Option<String>>,
}

impl ReviewPayload {
    /// `(score, text)` after applying the payload to `existing` (PATCH) or
    /// requiring a score (POST/PUT).
    pub fn validate(self, existing: Option<&Review>) -> Result<(Score, Option<String>), ApiError> {
        let score = match (self.score, existing) {
            (Some(raw), _) => Score::new(integer("score", &raw)?)?,
            (None, Some(review)) => review.score,
            (None, None) => return Err(ApiError::field("score", REQUIRED)),
        };
        let text = match (self.text, existing) {
            (Some(text), _) => text,
            (None, Some(review)) => review.text.clone(),
            (None, None) => None,
        };
        Ok((score, text))
    }
}

/// Integer from a JSON number or numeric string; `5.0` and `"5"` pass, `5.5` does not.
fn integer(field: &str, raw: &serde_json::Value) -> Result<i64, ApiError> {
    let parsed = match raw {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::field(field, "A valid integer is required."))
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.get(),
            text: comment.text.clone(),
            author: comment.author.username.clone(),
            pub_date: comment.pub_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    pub text: Option<String>,
}

impl CommentPayload {
    pub fn validate(self, existing: Option<&Comment>) -> Result<String, ApiError> {
        match (self.text, existing) {
            (Some(text), _) => Ok(validate_comment_text(&text)?),
            (None, Some(comment)) => Ok(comment.text.clone()),
            (None, None) => Err(ApiError::field("text", REQUIRED)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn fields(err: ApiError) -> ValidationErrors {
        match err {
            ApiError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn title_payload_requires_name_and_year_on_create() {
        let err = payload::<TitlePayload>(json!({})).into_draft(None).unwrap_err();
        let fields = fields(err);
        assert!(fields.get("name").is_some());
        assert!(fields.get("year").is_some());
    }

    #[test]
    fn title_patch_distinguishes_null_from_absent() {
        let p: TitlePayload = payload(json!({ "category": null }));
        assert_eq!(p.category, Some(None));
        assert!(p.genre.is_none());

        let p: TitlePayload = payload(json!({ "genre": ["drama"] }));
        assert_eq!(p.genre, Some(Some(vec!["drama".to_string()])));
        assert!(p.category.is_none());
    }

    #[test]
    fn review_score_is_bounded_and_required() {
        let err = payload::<ReviewPayload>(json!({ "score": 11 })).validate(None).unwrap_err();
        assert!(fields(err).get("score").is_some());

        let err = payload::<ReviewPayload>(json!({ "text": "meh" })).validate(None).unwrap_err();
        assert!(fields(err).get("score").is_some());

        let (score, text) = payload::<ReviewPayload>(json!({ "score": 10, "text": "great" }))
            .validate(None)
            .unwrap();
        assert_eq!(score.get(), 10);
        assert_eq!(text.as_deref(), Some("great"));
    }

    #[test]
    fn review_score_type_errors_are_field_scoped() {
        for bad in [json!("five"), json!(5.5), json!(true), json!([5])] {
            let err = payload::<ReviewPayload>(json!({ "score": bad })).validate(None).unwrap_err();
            assert!(fields(err).get("score").is_some(), "{bad}");
        }

        let (score, _) = payload::<ReviewPayload>(json!({ "score": "7" })).validate(None).unwrap();
        assert_eq!(score.get(), 7);
        let (score, _) = payload::<ReviewPayload>(json!({ "score": 3.0 })).validate(None).unwrap();
        assert_eq!(score.get(), 3);
    }

    #[test]
    fn user_payload_reports_every_bad_field() {
        let err = payload::<UserPayload>(json!({
            "username": "me",
            "email": "not-an-email",
            "role": "owner",
        }))
        .into_changes()
        .unwrap_err();
        let fields = fields(err);
        assert!(fields.get("username").is_some());
        assert!(fields.get("email").is_some());
        assert!(fields.get("role").is_some());
    }

    #[test]
    fn full_user_payload_needs_username_and_email() {
        let err = payload::<UserPayload>(json!({ "bio": "hi" })).into_new_user().unwrap_err();
        let fields = fields(err);
        assert_eq!(fields.get("username"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(fields.get("email"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn token_request_requires_both_fields() {
        let err = payload::<TokenRequest>(json!({ "email": "a@example.com" }))
            .validate()
            .unwrap_err();
        assert!(fields(err).get("confirmation_code").is_some());
    }

    #[test]
    fn paginated_envelope_copies_page_metadata() {
        let page = Page::new(vec![1, 2], 5, Pagination::new(Some(2), Some(0)));
        let out = Paginated::from_page(page, |n: i32| n * 10);
        assert_eq!(out.results, vec![10, 20]);
        assert_eq!(out.count, 5);
        assert!(out.has_more);
    }
}
