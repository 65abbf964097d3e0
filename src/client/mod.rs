//! Coaching backend boundary.
//!
//! The session talks to the backend only through the [`CoachBackend`]
//! trait; [`HttpCoachClient`] is the reqwest implementation.

pub mod http;
pub mod types;

pub use http::{CHAT_PATH, HttpCoachClient, PLAN_INIT_PATH};
pub use types::{ChatReply, ChatRequest, FollowupAnswers, PlanRequest, PlanResponse};

use async_trait::async_trait;

use crate::error::TransportError;

/// Remote coaching service.
#[async_trait]
pub trait CoachBackend: Send + Sync {
    /// Send a free-chat message and get structured blocks back.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, TransportError>;

    /// Submit the onboarding data and ask the backend to build a plan.
    async fn init_plan(&self, request: PlanRequest) -> Result<PlanResponse, TransportError>;
}
