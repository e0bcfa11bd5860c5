use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RatingSummary, Showtime, UnknownVariant};

/// What kind of cultural event a work is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    Film,
    Play,
    Concert,
    Exhibition,
}

impl WorkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Film => "film",
            WorkKind::Play => "play",
            WorkKind::Concert => "concert",
            WorkKind::Exhibition => "exhibition",
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "film" => Ok(WorkKind::Film),
            "play" => Ok(WorkKind::Play),
            "concert" => Ok(WorkKind::Concert),
            "exhibition" => Ok(WorkKind::Exhibition),
            _ => Err(UnknownVariant {
                kind: "work type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for WorkKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreativeWork {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[sqlx(try_from = "String")]
    pub kind: WorkKind,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreativeWork {
    /// Case-insensitive substring match on title or description.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle_lower))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkDetail {
    #[serde(flatten)]
    pub work: CreativeWork,
    pub showtimes: Vec<Showtime>,
    pub rating: RatingSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing_is_case_insensitive() {
        assert_eq!("Film".parse::<WorkKind>(), Ok(WorkKind::Film));
        assert_eq!("EXHIBITION".parse::<WorkKind>(), Ok(WorkKind::Exhibition));
        assert!("musical".parse::<WorkKind>().is_err());
    }

    #[test]
    fn test_matches_title_and_description() {
        let now = Utc::now();
        let work = CreativeWork {
            id: Uuid::new_v4(),
            title: "Harbour Walls".to_string(),
            slug: "harbour-walls".to_string(),
            kind: WorkKind::Play,
            description: Some("A family drama set in a fishing town".to_string()),
            duration_minutes: Some(110),
            featured: false,
            created_at: now,
            updated_at: now,
        };

        assert!(work.matches("harbour"));
        assert!(work.matches("fishing"));
        assert!(!work.matches("opera"));
    }
}
