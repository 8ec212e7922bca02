//! Companion data model as the client sees it.
//!
//! Everything here mirrors the backend's JSON documents. The client never
//! computes stats or moods itself, it only holds the latest snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How the companion's personality was chosen at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityMode {
    /// Picked from the backend's personality catalog.
    Predefined,
    /// Free-text description written by the user.
    Custom,
}

/// The user-created virtual pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub personality_type: PersonalityMode,
    #[serde(default)]
    pub personality_id: Option<String>,
    #[serde(default)]
    pub custom_personality: Option<String>,
    pub color: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_interaction: Option<String>,
}

fn default_level() -> u32 {
    1
}

impl Companion {
    /// Parse `last_interaction` as a UTC timestamp.
    ///
    /// The backend emits naive ISO-8601 strings (no offset) for UTC times;
    /// RFC 3339 strings with an offset are accepted too.
    pub fn last_interaction_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.last_interaction.as_deref()?;
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&chrono::Utc));
        }
        raw.parse::<chrono::NaiveDateTime>()
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Discrete emotional state computed by the backend.
///
/// Used both for `Stats::mood` and as the emotion tag of AI chat turns.
/// Unknown labels are preserved in `Other` so decoding never fails when the
/// backend grows new moods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mood {
    Happy,
    Content,
    #[default]
    Neutral,
    Sad,
    VerySad,
    Other(String),
}

impl Mood {
    pub fn from_label(label: &str) -> Self {
        match label {
            "happy" => Mood::Happy,
            "content" => Mood::Content,
            "neutral" => Mood::Neutral,
            "sad" => Mood::Sad,
            "very_sad" => Mood::VerySad,
            other => Mood::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Mood::Happy => "happy",
            Mood::Content => "content",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::VerySad => "very_sad",
            Mood::Other(label) => label,
        }
    }

    /// Whether this is one of the five moods the client knows how to draw.
    pub fn is_known(&self) -> bool {
        !matches!(self, Mood::Other(_))
    }
}

impl From<String> for Mood {
    fn from(label: String) -> Self {
        Mood::from_label(&label)
    }
}

impl From<Mood> for String {
    fn from(mood: Mood) -> Self {
        mood.label().to_string()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper bound of every stat.
pub const STAT_MAX: u8 = 100;

/// Accept any JSON number for a stat and clamp it into `[0, 100]`.
fn deserialize_stat<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_stat(raw))
}

/// Round and clamp a raw backend value into the stat range.
pub fn clamp_stat(raw: f64) -> u8 {
    if !raw.is_finite() {
        tracing::warn!("Non-finite stat value {} from backend, using 0", raw);
        return 0;
    }
    raw.round().clamp(0.0, STAT_MAX as f64) as u8
}

/// Latest snapshot of the companion's stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub pet_id: String,
    #[serde(deserialize_with = "deserialize_stat")]
    pub affection: u8,
    /// Hunger level: 0 is full, 100 is starving.
    #[serde(deserialize_with = "deserialize_stat")]
    pub hunger: u8,
    #[serde(deserialize_with = "deserialize_stat")]
    pub energy: u8,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Ai,
}

/// One message in the local transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// Only AI turns carry an emotion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Mood>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            emotion: None,
        }
    }

    pub fn ai(content: impl Into<String>, emotion: Mood) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            emotion: Some(emotion),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// A read-only entry of the backend's personality catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityOption {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
}

/// Client-local aggregate of the active companion and its stats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub companion: Option<Companion>,
    pub stats: Option<Stats>,
    pub is_loading: bool,
}

impl Session {
    /// Both halves present: the chat screen can be shown.
    pub fn is_ready(&self) -> bool {
        self.companion.is_some() && self.stats.is_some()
    }
}
