use crate::api_types::{
    ChatExchange, ChatReply, ChatRequest, ChatResponse, CompanionBundle, CreateCompanionRequest,
    CreateCompanionResponse, HealthStatus, HistoryEnvelope, InactivityReport,
    PersonalitiesEnvelope, StatsEnvelope, StatsPatch, UpdateStatsResponse,
};
use crate::error::{ClientError, ClientResult};
use crate::Backend;
use async_trait::async_trait;
use mia_core::config::BackendConfig;
use mia_core::{Companion, PersonalityOption, Stats};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// JSON-over-HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    api_root: Url,
}

impl HttpBackend {
    /// `api_root` is the URL every endpoint path is appended to, e.g.
    /// `http://localhost:8001/api`.
    pub fn new(api_root: &str) -> ClientResult<Self> {
        Self::with_timeout(api_root, None)
    }

    pub fn with_timeout(api_root: &str, timeout: Option<Duration>) -> ClientResult<Self> {
        let parsed = Url::parse(api_root)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {}", api_root, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(api_root.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_root: parsed,
        })
    }

    pub fn from_config(config: &BackendConfig) -> ClientResult<Self> {
        Self::with_timeout(
            &config.api_root(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Append path segments to the API root. Segments are percent-encoded,
    /// so ids can never escape their path position.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.api_root.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        Self::decode(response).await
    }

    async fn post<B, T>(&self, url: Url, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await.map_err(ClientError::from_transport)?;

        if status == StatusCode::NOT_FOUND {
            let detail = error_detail(&body);
            return Err(ClientError::NotFound(if detail.is_empty() { path } else { detail }));
        }
        if !status.is_success() {
            tracing::debug!("{} answered {}", path, status);
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Pull `detail` out of an error body; fall back to the raw (truncated) text.
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_personalities(&self) -> ClientResult<Vec<PersonalityOption>> {
        let envelope: PersonalitiesEnvelope = self.get(self.endpoint(&["personalities"])?).await?;
        Ok(envelope.personalities)
    }

    async fn create_companion(&self, request: &CreateCompanionRequest) -> ClientResult<Companion> {
        let response: CreateCompanionResponse =
            self.post(self.endpoint(&["pet", "create"])?, request).await?;
        match response {
            CreateCompanionResponse {
                success: true,
                pet: Some(pet),
            } => Ok(pet),
            _ => Err(ClientError::Rejected {
                operation: "create companion",
            }),
        }
    }

    async fn fetch_companion(&self, pet_id: &str) -> ClientResult<CompanionBundle> {
        self.get(self.endpoint(&["pet", pet_id])?).await
    }

    async fn send_chat(&self, pet_id: &str, message: &str) -> ClientResult<ChatReply> {
        let request = ChatRequest { pet_id, message };
        let response: ChatResponse = self.post(self.endpoint(&["chat"])?, &request).await?;
        match response {
            ChatResponse {
                success: true,
                response: Some(text),
                emotion,
                sentiment_score,
            } => Ok(ChatReply {
                text,
                emotion,
                sentiment_score,
            }),
            _ => Err(ClientError::Rejected { operation: "chat" }),
        }
    }

    async fn fetch_stats(&self, pet_id: &str) -> ClientResult<Stats> {
        let envelope: StatsEnvelope = self.get(self.endpoint(&["stats", pet_id])?).await?;
        Ok(envelope.stats)
    }

    async fn fetch_history(&self, pet_id: &str, limit: u32) -> ClientResult<Vec<ChatExchange>> {
        let mut url = self.endpoint(&["chat", "history", pet_id])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let envelope: HistoryEnvelope = self.get(url).await?;
        Ok(envelope.chats)
    }

    async fn check_inactive(&self, pet_id: &str) -> ClientResult<InactivityReport> {
        self.get(self.endpoint(&["check-inactive", pet_id])?).await
    }

    async fn health(&self) -> ClientResult<HealthStatus> {
        self.get(self.endpoint(&["health"])?).await
    }

    async fn update_stats(&self, patch: &StatsPatch) -> ClientResult<Stats> {
        let response: UpdateStatsResponse =
            self.post(self.endpoint(&["stats", "update"])?, patch).await?;
        match response {
            UpdateStatsResponse {
                success: true,
                stats: Some(stats),
            } => Ok(stats),
            _ => Err(ClientError::Rejected {
                operation: "update stats",
            }),
        }
    }
}
