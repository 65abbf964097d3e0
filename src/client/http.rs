//! reqwest-based coaching backend client.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::CoachBackend;
use super::types::{ChatReply, ChatRequest, PlanRequest, PlanResponse};
use crate::blocks::decode_response;
use crate::config::CoachConfig;
use crate::error::{ConfigError, TransportError};

pub const CHAT_PATH: &str = "/agent/chat";
pub const PLAN_INIT_PATH: &str = "/agent/plan-init";

/// JSON-over-HTTP client for the coaching backend.
pub struct HttpCoachClient {
    base_url: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

impl HttpCoachClient {
    pub fn new(config: &CoachConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "http_client".into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body. Any non-2xx status is a failure, whatever the body.
    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, TransportError> {
        let endpoint = path.to_string();
        debug!(endpoint = %endpoint, "Sending backend request");

        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(&endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint = %endpoint, status = status.as_u16(), "Backend returned error status");
            return Err(TransportError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            })
    }

    fn request_error(&self, endpoint: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: self.timeout,
            }
        } else {
            TransportError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

fn parse<T: DeserializeOwned>(endpoint: &str, value: serde_json::Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl CoachBackend for HttpCoachClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, TransportError> {
        let body = self.post_json(CHAT_PATH, &request).await?;
        let content = decode_response(&body)?;
        info!(
            blocks = content.blocks.len(),
            anomalies = content.anomalies.len(),
            "Chat response received"
        );
        Ok(ChatReply { content })
    }

    async fn init_plan(&self, request: PlanRequest) -> Result<PlanResponse, TransportError> {
        let body = self.post_json(PLAN_INIT_PATH, &request).await?;
        let response: PlanResponse = parse(PLAN_INIT_PATH, body)?;
        info!(
            status = %response.status,
            session_id = response.session_id.as_deref().unwrap_or("-"),
            "Plan initialized"
        );
        Ok(response)
    }
}
