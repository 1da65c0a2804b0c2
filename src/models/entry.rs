use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of mood labels. Declaration order is significant: it is the
/// tie-break order for monthly top-emotion ranking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "emotion_tag", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Joy,
    Proud,
    Calm,
    Tired,
    Sad,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Joy,
        Emotion::Proud,
        Emotion::Calm,
        Emotion::Tired,
        Emotion::Sad,
    ];

    /// Moods counted toward the monthly positivity rate.
    pub const POSITIVE: [Emotion; 3] = [Emotion::Happy, Emotion::Joy, Emotion::Proud];

    pub fn is_positive(self) -> bool {
        Self::POSITIVE.contains(&self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Joy => "joyful",
            Emotion::Proud => "proud",
            Emotion::Calm => "calm",
            Emotion::Tired => "tired",
            Emotion::Sad => "sad",
        }
    }
}

/// One free-text remark within an entry, under a titled category
/// (e.g. "self", "others", "situation"). Items have no lifecycle of their
/// own: every resave of the parent entry replaces them wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GratitudeItem {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub title: String,
    pub content: String,
    pub sort_order: i32,
}

/// One user's journaling record for a single calendar date.
/// At most one entry exists per (user_id, entry_date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GratitudeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub emotion: Emotion,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<GratitudeItem>,
}

/// Item payload for a save: the store assigns ids and order indices.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub content: String,
}

/// Save payload for the (user, date) upsert.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub entry_date: NaiveDate,
    pub emotion: Emotion,
    pub summary: String,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Deserialize)]
pub struct SaveEntryRequest {
    pub entry_date: NaiveDate,
    pub emotion: Emotion,
    /// Already-generated one-line summary. When absent the server asks the
    /// text-generation service before persisting.
    pub summary: Option<String>,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}
