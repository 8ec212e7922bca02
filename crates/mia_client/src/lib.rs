//! Client for the MIA companion backend.
//!
//! One method per remote operation, one round trip per call. No retries and
//! no caching: failures go straight back to the caller.

pub mod api_types;
pub mod error;
pub mod http;
pub mod mock;

pub use api_types::{
    ChatExchange, ChatReply, CompanionBundle, CreateCompanionRequest, HealthStatus,
    InactivityReport, StatsPatch,
};
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use mock::MockBackend;

use async_trait::async_trait;
use mia_core::{Companion, PersonalityOption, Stats};

#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /personalities`
    async fn list_personalities(&self) -> ClientResult<Vec<PersonalityOption>>;

    /// `POST /pet/create`
    async fn create_companion(&self, request: &CreateCompanionRequest) -> ClientResult<Companion>;

    /// `GET /pet/{id}`
    async fn fetch_companion(&self, pet_id: &str) -> ClientResult<CompanionBundle>;

    /// `POST /chat`
    async fn send_chat(&self, pet_id: &str, message: &str) -> ClientResult<ChatReply>;

    /// `GET /stats/{id}`
    async fn fetch_stats(&self, pet_id: &str) -> ClientResult<Stats>;

    /// `GET /chat/history/{id}?limit=N`, oldest exchange first.
    async fn fetch_history(&self, pet_id: &str, limit: u32) -> ClientResult<Vec<ChatExchange>>;

    /// `GET /check-inactive/{id}`
    async fn check_inactive(&self, pet_id: &str) -> ClientResult<InactivityReport>;

    /// `GET /health`
    async fn health(&self) -> ClientResult<HealthStatus>;

    /// `POST /stats/update`
    async fn update_stats(&self, patch: &StatsPatch) -> ClientResult<Stats>;
}
