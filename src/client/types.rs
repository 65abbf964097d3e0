//! Request/response shapes of the coaching backend.

use serde::{Deserialize, Serialize};

use crate::blocks::DecodedBlocks;
use crate::onboarding::BasicInfo;
use crate::survey::LifestyleAnswers;

/// Answers to the three follow-up questions asked at the start of chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupAnswers {
    pub q1: String,
    pub q2: String,
    pub q3: String,
}

/// `POST /agent/chat` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Decoded `POST /agent/chat` response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: DecodedBlocks,
}

/// `POST /agent/plan-init` body — everything collected during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub user_name: String,
    #[serde(rename = "basicInfo")]
    pub basic_info: BasicInfo,
    pub lifestyle: LifestyleAnswers,
    pub followup: FollowupAnswers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// `POST /agent/plan-init` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
