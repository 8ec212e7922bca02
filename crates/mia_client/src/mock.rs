//! Mock backend: deterministic, in-process, no server required.
//!
//! Behaves like the real service closely enough for the flows to be driven
//! end to end (creation seeds stats, chatting bumps affection), and lets a
//! caller script failures per operation and inspect every call made.

use crate::api_types::{
    ChatExchange, ChatReply, CompanionBundle, CreateCompanionRequest, HealthStatus,
    InactivityReport, StatsPatch,
};
use crate::error::{ClientError, ClientResult};
use crate::Backend;
use async_trait::async_trait;
use mia_core::{Companion, Mood, PersonalityOption, Stats};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPersonalities,
    CreateCompanion,
    FetchCompanion,
    SendChat,
    FetchStats,
    FetchHistory,
    CheckInactive,
    Health,
    UpdateStats,
}

/// A failure the mock can be told to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    Unreachable,
    NotFound,
    Status(u16),
    Rejected,
}

impl MockFailure {
    fn into_error(self, op: Operation) -> ClientError {
        match self {
            MockFailure::Unreachable => {
                ClientError::Unreachable(format!("mock backend offline ({:?})", op))
            }
            MockFailure::NotFound => ClientError::NotFound(format!("{:?}", op)),
            MockFailure::Status(status) => ClientError::Status {
                status,
                detail: format!("mock failure ({:?})", op),
            },
            MockFailure::Rejected => ClientError::Rejected { operation: "mock" },
        }
    }
}

/// One recorded call: the operation and its main argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Operation,
    pub arg: Option<String>,
}

#[derive(Default)]
struct Script {
    personalities: Vec<PersonalityOption>,
    companions: HashMap<String, Companion>,
    stats: HashMap<String, Stats>,
    /// Companions whose `GET /pet/{id}` answer comes back with `stats: null`.
    bundle_without_stats: Vec<String>,
    replies: VecDeque<ClientResult<ChatReply>>,
    history: HashMap<String, Vec<ChatExchange>>,
    inactivity: HashMap<String, InactivityReport>,
    failures: HashMap<Operation, MockFailure>,
    /// Stats mood left behind by a chat turn; the reply emotion when unset.
    mood_after_chat: Option<Mood>,
    calls: Vec<Call>,
    next_id: u32,
}

#[derive(Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    chat_gate: Option<Arc<Semaphore>>,
    latency: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock pre-loaded with the backend's four stock personalities.
    pub fn demo() -> Self {
        let catalog = [
            ("cheerful", "Cheerful", "😊", "Always happy and optimistic, loves to spread joy!"),
            ("shy", "Shy", "😌", "A bit timid but very sweet and caring."),
            ("adventurous", "Adventurous", "🌟", "Bold and curious, always ready for new experiences!"),
            ("calm", "Calm", "🧘", "Peaceful and wise, brings tranquility to your day."),
        ];
        let personalities = catalog
            .iter()
            .map(|(id, name, emoji, description)| PersonalityOption {
                id: id.to_string(),
                name: name.to_string(),
                emoji: emoji.to_string(),
                description: description.to_string(),
            })
            .collect();
        Self::new()
            .with_personalities(personalities)
            .with_latency(Duration::from_millis(200))
    }

    pub fn with_personalities(mut self, personalities: Vec<PersonalityOption>) -> Self {
        self.script.get_mut().personalities = personalities;
        self
    }

    /// Register an existing companion and, optionally, its stats.
    pub fn with_companion(mut self, companion: Companion, stats: Option<Stats>) -> Self {
        let script = self.script.get_mut();
        if let Some(stats) = stats {
            script.stats.insert(companion.id.clone(), stats);
        }
        script.companions.insert(companion.id.clone(), companion);
        self
    }

    /// `GET /pet/{id}` for this companion answers with `stats: null`.
    pub fn without_bundled_stats(mut self, pet_id: &str) -> Self {
        self.script
            .get_mut()
            .bundle_without_stats
            .push(pet_id.to_string());
        self
    }

    pub fn with_history(mut self, pet_id: &str, history: Vec<ChatExchange>) -> Self {
        self.script
            .get_mut()
            .history
            .insert(pet_id.to_string(), history);
        self
    }

    pub fn with_inactivity(mut self, pet_id: &str, report: InactivityReport) -> Self {
        self.script
            .get_mut()
            .inactivity
            .insert(pet_id.to_string(), report);
        self
    }

    /// Every call to `op` fails until [`MockBackend::recover`] is called.
    pub fn failing(mut self, op: Operation, failure: MockFailure) -> Self {
        self.script.get_mut().failures.insert(op, failure);
        self
    }

    /// Chat turns leave the stats mood at `mood` instead of the reply
    /// emotion, as a backend that scores mood separately would.
    pub fn with_mood_after_chat(mut self, mood: Mood) -> Self {
        self.script.get_mut().mood_after_chat = Some(mood);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Hold every chat reply until a permit is added to the returned
    /// semaphore. Lets a caller observe an exchange mid-flight.
    pub fn gate_chat(&mut self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.chat_gate = Some(gate.clone());
        gate
    }

    pub async fn fail(&self, op: Operation, failure: MockFailure) {
        self.script.lock().await.failures.insert(op, failure);
    }

    pub async fn recover(&self, op: Operation) {
        self.script.lock().await.failures.remove(&op);
    }

    /// Queue a reply (or error) for the next chat call.
    pub async fn push_reply(&self, reply: ClientResult<ChatReply>) {
        self.script.lock().await.replies.push_back(reply);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.script.lock().await.calls.clone()
    }

    pub async fn call_count(&self, op: Operation) -> usize {
        self.script
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    pub async fn stats_of(&self, pet_id: &str) -> Option<Stats> {
        self.script.lock().await.stats.get(pet_id).cloned()
    }

    /// Record the call, then apply latency and any scripted failure.
    async fn begin(&self, op: Operation, arg: Option<&str>) -> ClientResult<()> {
        let failure = {
            let mut script = self.script.lock().await;
            script.calls.push(Call {
                op,
                arg: arg.map(str::to_string),
            });
            script.failures.get(&op).cloned()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(failure) => Err(failure.into_error(op)),
            None => Ok(()),
        }
    }
}

fn initial_stats(pet_id: &str) -> Stats {
    Stats {
        pet_id: pet_id.to_string(),
        affection: 50,
        hunger: 50,
        energy: 50,
        mood: Mood::Neutral,
        updated_at: None,
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_personalities(&self) -> ClientResult<Vec<PersonalityOption>> {
        self.begin(Operation::ListPersonalities, None).await?;
        Ok(self.script.lock().await.personalities.clone())
    }

    async fn create_companion(&self, request: &CreateCompanionRequest) -> ClientResult<Companion> {
        self.begin(Operation::CreateCompanion, Some(&request.name))
            .await?;
        let mut script = self.script.lock().await;
        script.next_id += 1;
        let id = format!("pet-{}", script.next_id);
        let companion = Companion {
            id: id.clone(),
            user_id: Some(request.user_id.clone()),
            name: request.name.clone(),
            personality_type: request.personality_type,
            personality_id: request.personality_id.clone(),
            custom_personality: request.custom_personality.clone(),
            color: request.color.clone(),
            level: 1,
            created_at: None,
            last_interaction: None,
        };
        script.stats.insert(id.clone(), initial_stats(&id));
        script.companions.insert(id, companion.clone());
        Ok(companion)
    }

    async fn fetch_companion(&self, pet_id: &str) -> ClientResult<CompanionBundle> {
        self.begin(Operation::FetchCompanion, Some(pet_id)).await?;
        let script = self.script.lock().await;
        let pet = script
            .companions
            .get(pet_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Pet not found".into()))?;
        let stats = if script.bundle_without_stats.iter().any(|id| id == pet_id) {
            None
        } else {
            script.stats.get(pet_id).cloned()
        };
        Ok(CompanionBundle { pet, stats })
    }

    async fn send_chat(&self, pet_id: &str, message: &str) -> ClientResult<ChatReply> {
        self.begin(Operation::SendChat, Some(message)).await?;
        if let Some(gate) = &self.chat_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ClientError::Unreachable("chat gate closed".into()))?;
            permit.forget();
        }

        let mut script = self.script.lock().await;
        let reply = match script.replies.pop_front() {
            Some(scripted) => scripted?,
            None => ChatReply::new(format!("(Mock) You said: {}", message), Mood::Content),
        };

        // Same bookkeeping the real service does after a chat turn
        let mood = script
            .mood_after_chat
            .clone()
            .unwrap_or_else(|| reply.emotion.clone());
        if let Some(stats) = script.stats.get_mut(pet_id) {
            stats.affection = (stats.affection + 5).min(100);
            stats.energy = stats.energy.saturating_sub(2);
            stats.mood = mood;
        }
        script
            .history
            .entry(pet_id.to_string())
            .or_default()
            .push(ChatExchange::new(message, &reply.text, reply.emotion.clone()));

        Ok(reply)
    }

    async fn fetch_stats(&self, pet_id: &str) -> ClientResult<Stats> {
        self.begin(Operation::FetchStats, Some(pet_id)).await?;
        self.script
            .lock()
            .await
            .stats
            .get(pet_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Stats not found".into()))
    }

    async fn fetch_history(&self, pet_id: &str, limit: u32) -> ClientResult<Vec<ChatExchange>> {
        self.begin(Operation::FetchHistory, Some(pet_id)).await?;
        let script = self.script.lock().await;
        let all = script.history.get(pet_id).cloned().unwrap_or_default();
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn check_inactive(&self, pet_id: &str) -> ClientResult<InactivityReport> {
        self.begin(Operation::CheckInactive, Some(pet_id)).await?;
        Ok(self
            .script
            .lock()
            .await
            .inactivity
            .get(pet_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn health(&self) -> ClientResult<HealthStatus> {
        self.begin(Operation::Health, None).await?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            service: Some("MIA mock backend".to_string()),
        })
    }

    async fn update_stats(&self, patch: &StatsPatch) -> ClientResult<Stats> {
        self.begin(Operation::UpdateStats, Some(&patch.pet_id)).await?;
        let mut script = self.script.lock().await;
        let stats = script
            .stats
            .get_mut(&patch.pet_id)
            .ok_or_else(|| ClientError::NotFound("Stats not found".into()))?;
        if let Some(v) = patch.affection {
            stats.affection = v.min(100);
        }
        if let Some(v) = patch.hunger {
            stats.hunger = v.min(100);
        }
        if let Some(v) = patch.energy {
            stats.energy = v.min(100);
        }
        Ok(stats.clone())
    }
}
