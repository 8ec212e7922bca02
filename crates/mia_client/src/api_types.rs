//! Request and response bodies of the companion backend.
//!
//! Response envelopes only declare the fields the client consumes; anything
//! else the backend sends is ignored.

use mia_core::{ChatTurn, Companion, Mood, PersonalityMode, PersonalityOption, Stats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalitiesEnvelope {
    pub personalities: Vec<PersonalityOption>,
}

/// Body of `POST /pet/create`. Fields of the mode not chosen are sent as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCompanionRequest {
    pub user_id: String,
    pub name: String,
    pub personality_type: PersonalityMode,
    pub personality_id: Option<String>,
    pub custom_personality: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub pet: Option<Companion>,
}

/// `GET /pet/{id}`: the companion plus its stats, which may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionBundle {
    pub pet: Companion,
    #[serde(default)]
    pub stats: Option<Stats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub pet_id: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub emotion: Mood,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

/// A settled chat reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub emotion: Mood,
    pub sentiment_score: Option<f64>,
}

impl ChatReply {
    pub fn new(text: impl Into<String>, emotion: Mood) -> Self {
        Self {
            text: text.into(),
            emotion,
            sentiment_score: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsEnvelope {
    pub stats: Stats,
}

/// One stored exchange: the user's message and the companion's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub emotion: Mood,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ChatExchange {
    pub fn new(user_message: &str, ai_response: &str, emotion: Mood) -> Self {
        Self {
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            emotion,
            timestamp: None,
        }
    }

    /// Split into the user turn followed by the AI turn.
    pub fn into_turns(self) -> [ChatTurn; 2] {
        [
            ChatTurn::user(self.user_message),
            ChatTurn::ai(self.ai_response, self.emotion),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEnvelope {
    #[serde(default)]
    pub chats: Vec<ChatExchange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InactivityReport {
    pub inactive: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Whole hours since the last interaction, when inactive.
    #[serde(default)]
    pub hours: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// Body of `POST /stats/update`. Omitted fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsPatch {
    pub pet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affection: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunger: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub stats: Option<Stats>,
}
