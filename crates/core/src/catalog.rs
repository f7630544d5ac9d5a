//! Catalog entities: reference data (categories, genres) and titles.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, ValidationErrors};
use crate::id::{ReferenceId, TitleId};
use crate::slug::Slug;

pub const MAX_NAME_LEN: usize = 255;

/// Which reference table an entry belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Category,
    Genre,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Category => "category",
            ReferenceKind::Genre => "genre",
        }
    }
}

impl core::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, slug-addressed reference row (category or genre).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: ReferenceId,
    pub name: String,
    pub slug: Slug,
}

pub type Category = ReferenceEntry;
pub type Genre = ReferenceEntry;

/// Validated input for a new category/genre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReference {
    pub name: String,
    pub slug: Slug,
}

impl NewReference {
    pub fn new(name: &str, slug: &str) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();
        let name = match validate_name(name) {
            Ok(name) => Some(name),
            Err(DomainError::Validation(e)) => {
                errors.merge(e);
                None
            }
            Err(other) => return Err(other),
        };
        let slug = match Slug::parse(slug) {
            Ok(slug) => Some(slug),
            Err(DomainError::Validation(e)) => {
                errors.merge(e);
                None
            }
            Err(other) => return Err(other),
        };
        match (name, slug) {
            (Some(name), Some(slug)) => Ok(Self { name, slug }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

/// Trim and bound-check a display name.
pub fn validate_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::field("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::field(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

/// Release year of a title (non-negative small integer).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ReleaseYear(u16);

impl ReleaseYear {
    pub const MAX: i64 = 32767;

    pub fn new(raw: i64) -> DomainResult<Self> {
        if !(0..=Self::MAX).contains(&raw) {
            return Err(DomainError::field(
                "year",
                format!("Ensure this value is between 0 and {}.", Self::MAX),
            ));
        }
        Ok(Self(raw as u16))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for ReleaseYear {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReleaseYear> for i64 {
    fn from(value: ReleaseYear) -> Self {
        i64::from(value.0)
    }
}

/// A creative work that can be reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: TitleId,
    pub name: String,
    pub year: ReleaseYear,
    pub description: String,
    pub genres: Vec<Genre>,
    /// Cleared (not cascaded) when the category is deleted.
    pub category: Option<Category>,
}

/// A title annotated with the average score of its reviews.
///
/// `rating` is computed at query time and is `None` when there are no reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedTitle {
    pub title: Title,
    pub rating: Option<f64>,
}

/// Fully resolved input for creating or replacing a title.
///
/// Category and genres are already resolved to existing rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTitle {
    pub name: String,
    pub year: ReleaseYear,
    pub description: String,
    pub category: Option<ReferenceId>,
    pub genres: Vec<ReferenceId>,
}

impl NewTitle {
    /// Genres deduplicated, preserving first occurrence.
    pub fn unique_genres(&self) -> Vec<ReferenceId> {
        let mut seen = Vec::with_capacity(self.genres.len());
        for id in &self.genres {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}
