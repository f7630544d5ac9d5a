//! Review score (inclusive 1..=10).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A validated review score.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(u8);

impl Score {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;

    pub fn new(raw: i64) -> Result<Self, DomainError> {
        if raw < Self::MIN {
            return Err(DomainError::field(
                "score",
                format!("Ensure this value is greater than or equal to {}.", Self::MIN),
            ));
        }
        if raw > Self::MAX {
            return Err(DomainError::field(
                "score",
                format!("Ensure this value is less than or equal to {}.", Self::MAX),
            ));
        }
        Ok(Self(raw as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for i64 {
    fn from(value: Score) -> Self {
        i64::from(value.0)
    }
}

/// Arithmetic mean of a set of scores; `None` for an empty set.
pub fn average(scores: impl IntoIterator<Item = Score>) -> Option<f64> {
    let (sum, count) = scores
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), s| (sum + u64::from(s.get()), count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}
