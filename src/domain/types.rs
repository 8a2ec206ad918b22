//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Editorial state of an article. New articles start as drafts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "news_status", rename_all = "snake_case")]
pub enum NewsStatus {
    #[default]
    Draft,
    Publish,
    Deleted,
}

impl NewsStatus {
    pub const ALL: [NewsStatus; 3] = [NewsStatus::Draft, NewsStatus::Publish, NewsStatus::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            NewsStatus::Draft => "draft",
            NewsStatus::Publish => "publish",
            NewsStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NewsStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| DomainError::unknown_status(value))
    }
}
