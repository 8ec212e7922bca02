//! Companion creation: local validation, then create + initial stats.

use mia_client::{Backend, ClientError, CreateCompanionRequest};
use mia_core::{Companion, PersonalityMode, PersonalityOption, SessionStore};
use std::sync::Arc;
use thiserror::Error;

/// Colors offered by the creation form.
pub const PALETTE: [&str; 5] = ["#FFB6C1", "#87CEEB", "#FFD700", "#98FB98", "#DDA0DD"];
pub const DEFAULT_COLOR: &str = "#FFB6C1";
pub const NAME_MAX_CHARS: usize = 20;
pub const CUSTOM_PERSONALITY_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalityChoice {
    /// Catalog entry id, `None` until the user picks one.
    Predefined(Option<String>),
    /// Free-text description.
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationForm {
    pub name: String,
    pub personality: PersonalityChoice,
    pub color: String,
}

impl Default for CreationForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            personality: PersonalityChoice::Predefined(None),
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

/// Input problems caught before anything is sent. The messages are shown
/// to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a name for your AI friend")]
    EmptyName,

    #[error("Names can be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("Please select a personality")]
    MissingPersonality,

    #[error("Please describe your custom personality")]
    EmptyCustomPersonality,

    #[error("Personality descriptions can be at most {max} characters")]
    CustomPersonalityTooLong { max: usize },
}

impl CreationForm {
    /// Check the form and resolve it into a creation request. Fields that do
    /// not apply to the chosen mode are sent as null.
    pub fn validate(&self, user_id: &str) -> Result<CreateCompanionRequest, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(ValidationError::NameTooLong {
                max: NAME_MAX_CHARS,
            });
        }

        let (personality_type, personality_id, custom_personality) = match &self.personality {
            PersonalityChoice::Predefined(None) => {
                return Err(ValidationError::MissingPersonality)
            }
            PersonalityChoice::Predefined(Some(id)) => {
                (PersonalityMode::Predefined, Some(id.clone()), None)
            }
            PersonalityChoice::Custom(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ValidationError::EmptyCustomPersonality);
                }
                if text.chars().count() > CUSTOM_PERSONALITY_MAX_CHARS {
                    return Err(ValidationError::CustomPersonalityTooLong {
                        max: CUSTOM_PERSONALITY_MAX_CHARS,
                    });
                }
                (PersonalityMode::Custom, None, Some(text.to_string()))
            }
        };

        Ok(CreateCompanionRequest {
            user_id: user_id.to_string(),
            name: name.to_string(),
            personality_type,
            personality_id,
            custom_personality,
            color: self.color.clone(),
        })
    }
}

#[derive(Error, Debug)]
pub enum CreationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Failed to create your AI friend. Please try again.")]
    Backend(#[source] ClientError),

    /// The companion exists and is saved, only its stats are missing.
    /// Resume through bootstrap instead of creating again.
    #[error("Your AI friend was created, but their stats could not be loaded: {reason}")]
    StatsUnavailable { companion_id: String, reason: String },
}

impl CreationError {
    /// Whether resubmitting the same form makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CreationError::Backend(_))
    }
}

pub struct CreationFlow {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    user_id: String,
}

impl CreationFlow {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>, user_id: &str) -> Self {
        Self {
            backend,
            session,
            user_id: user_id.to_string(),
        }
    }

    /// Personality catalog. An unreachable backend yields an empty list.
    pub async fn load_personalities(&self) -> Vec<PersonalityOption> {
        match self.backend.list_personalities().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Failed to load personalities: {}", e);
                Vec::new()
            }
        }
    }

    /// Create the companion described by `form` and seed the session with it
    /// and its initial stats. The form is only borrowed, so the caller keeps
    /// the input for a retry.
    pub async fn submit(&self, form: &CreationForm) -> Result<Companion, CreationError> {
        let request = form.validate(&self.user_id)?;

        self.session.set_loading(true);
        let result = self.create(&request).await;
        self.session.set_loading(false);
        result
    }

    async fn create(&self, request: &CreateCompanionRequest) -> Result<Companion, CreationError> {
        let companion = self
            .backend
            .create_companion(request)
            .await
            .map_err(|e| {
                tracing::warn!("Companion creation failed: {}", e);
                CreationError::Backend(e)
            })?;
        tracing::info!("Created companion {} ({})", companion.name, companion.id);
        self.session.set_companion(companion.clone());

        let stats = self
            .backend
            .fetch_stats(&companion.id)
            .await
            .map_err(|e| CreationError::StatsUnavailable {
                companion_id: companion.id.clone(),
                reason: e.to_string(),
            })?;
        self.session
            .set_stats(stats)
            .map_err(|e| CreationError::StatsUnavailable {
                companion_id: companion.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(companion)
    }
}
