//! Conversation with the active companion.
//!
//! Everything that writes the transcript goes through a single send gate:
//! a second message waits for the first round trip and its stats refresh,
//! and history hydration or the inactivity notice never lands inside an
//! exchange. Transcript order therefore always matches submission order.

use mia_client::{Backend, ClientError, StatsPatch};
use mia_core::{ChatTurn, Mood, SessionError, SessionStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Shown in place of a reply when the exchange fails.
pub const APOLOGY: &str = "Sorry, I couldn't respond. Please try again.";

/// Longer messages are cut to this many characters before sending.
pub const MESSAGE_MAX_CHARS: usize = 500;

const INACTIVITY_FALLBACK: &str = "I missed you! Where have you been?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Sending,
    Settled,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Settled { reply: ChatTurn },
    /// Carries the submitted text so it can be sent again as-is.
    Failed { retry_text: String },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("No active companion")]
    NoCompanion,

    #[error(transparent)]
    Backend(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Default)]
struct ChatState {
    transcript: Vec<ChatTurn>,
    state: ExchangeState,
    emotion: Mood,
    inactivity_checked: bool,
}

pub struct ChatFlow {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    history_limit: u32,
    state: RwLock<ChatState>,
    send_gate: Mutex<()>,
}

impl ChatFlow {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>, history_limit: u32) -> Self {
        let emotion = session
            .get()
            .stats
            .as_ref()
            .map(|s| s.mood.clone())
            .unwrap_or_default();
        Self {
            backend,
            session,
            history_limit,
            state: RwLock::new(ChatState {
                emotion,
                ..ChatState::default()
            }),
            send_gate: Mutex::new(()),
        }
    }

    /// Hydrate the transcript, then surface the inactivity notice if any.
    pub async fn enter(&self) {
        self.load_history(self.history_limit).await;
        self.check_inactivity().await;
    }

    /// Send one message. Returns `None` when nothing was sent: blank input,
    /// or no companion to talk to.
    pub async fn send(&self, text: &str) -> Option<ExchangeOutcome> {
        let text = text.trim();
        if text.is_empty() || self.session.active_companion_id().is_none() {
            return None;
        }

        let text = match text.char_indices().nth(MESSAGE_MAX_CHARS) {
            Some((cut, _)) => {
                tracing::debug!("Message cut to {} characters", MESSAGE_MAX_CHARS);
                &text[..cut]
            }
            None => text,
        };

        let _gate = self.send_gate.lock().await;
        // The companion may have been cleared while we queued
        let pet_id = self.session.active_companion_id()?;

        {
            let mut st = self.state.write().await;
            st.transcript.push(ChatTurn::user(text));
            st.state = ExchangeState::Sending;
        }

        match self.backend.send_chat(&pet_id, text).await {
            Ok(reply) => {
                let turn = ChatTurn::ai(reply.text, reply.emotion.clone());
                {
                    let mut st = self.state.write().await;
                    st.transcript.push(turn.clone());
                    st.emotion = reply.emotion;
                    st.state = ExchangeState::Settled;
                }
                self.refresh_stats(&pet_id).await;
                Some(ExchangeOutcome::Settled { reply: turn })
            }
            Err(e) => {
                tracing::warn!("Chat with {} failed: {}", pet_id, e);
                let mut st = self.state.write().await;
                st.transcript.push(ChatTurn::ai(APOLOGY, Mood::Sad));
                st.emotion = Mood::Sad;
                st.state = ExchangeState::Failed;
                Some(ExchangeOutcome::Failed {
                    retry_text: text.to_string(),
                })
            }
        }
    }

    async fn refresh_stats(&self, pet_id: &str) {
        match self.backend.fetch_stats(pet_id).await {
            Ok(stats) => {
                let mood = stats.mood.clone();
                match self.session.set_stats(stats) {
                    Ok(()) => self.state.write().await.emotion = mood,
                    Err(e) => tracing::debug!("Dropped refreshed stats: {}", e),
                }
            }
            Err(e) => tracing::warn!("Stats refresh for {} failed: {}", pet_id, e),
        }
    }

    /// Replace the transcript with the most recent `limit` exchanges.
    pub async fn load_history(&self, limit: u32) {
        let _gate = self.send_gate.lock().await;
        let Some(pet_id) = self.session.active_companion_id() else {
            return;
        };
        match self.backend.fetch_history(&pet_id, limit).await {
            Ok(history) => {
                let turns: Vec<ChatTurn> = history
                    .into_iter()
                    .flat_map(|exchange| exchange.into_turns())
                    .collect();
                tracing::debug!("Loaded {} turns of history", turns.len());
                self.state.write().await.transcript = turns;
            }
            Err(e) => tracing::warn!("Failed to load chat history: {}", e),
        }
    }

    /// Ask the backend whether the companion missed the user. Runs at most
    /// once per flow, failed attempts included.
    pub async fn check_inactivity(&self) {
        let _gate = self.send_gate.lock().await;
        {
            let mut st = self.state.write().await;
            if st.inactivity_checked {
                return;
            }
            st.inactivity_checked = true;
        }
        let Some(pet_id) = self.session.active_companion_id() else {
            return;
        };

        match self.backend.check_inactive(&pet_id).await {
            Ok(report) if report.inactive => {
                let message = report
                    .message
                    .unwrap_or_else(|| INACTIVITY_FALLBACK.to_string());
                tracing::info!("Companion {} was inactive for {:?}h", pet_id, report.hours);
                self.state
                    .write()
                    .await
                    .transcript
                    .push(ChatTurn::ai(message, Mood::Sad));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Inactivity check failed: {}", e),
        }
    }

    /// Lower hunger by `amount` and store the stats the backend returns.
    pub async fn feed(&self, amount: u8) -> Result<(), FeedError> {
        let _gate = self.send_gate.lock().await;
        let session = self.session.get();
        let (Some(companion), Some(stats)) = (&session.companion, &session.stats) else {
            return Err(FeedError::NoCompanion);
        };

        let patch = StatsPatch {
            pet_id: companion.id.clone(),
            hunger: Some(stats.hunger.saturating_sub(amount)),
            ..StatsPatch::default()
        };
        let updated = self.backend.update_stats(&patch).await?;
        let mood = updated.mood.clone();
        self.session.set_stats(updated)?;
        self.state.write().await.emotion = mood;
        Ok(())
    }

    pub async fn transcript(&self) -> Vec<ChatTurn> {
        self.state.read().await.transcript.clone()
    }

    pub async fn state(&self) -> ExchangeState {
        self.state.read().await.state
    }

    /// True while a reply is outstanding.
    pub async fn is_typing(&self) -> bool {
        self.state.read().await.state == ExchangeState::Sending
    }

    /// Mood the avatar shows: the latest reply tag until fresh stats arrive,
    /// then the stats mood.
    pub async fn current_emotion(&self) -> Mood {
        self.state.read().await.emotion.clone()
    }
}
