//! Onboarding stage machine — tracks which screen of the flow the user is on.

use serde::{Deserialize, Serialize};

/// The stages of the onboarding flow.
///
/// Progresses linearly: Welcome → BasicInfo → Survey → Chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    #[default]
    Welcome,
    BasicInfo,
    Survey,
    Chat,
}

impl OnboardingStage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStage) -> bool {
        use OnboardingStage::*;
        matches!(
            (self, target),
            (Welcome, BasicInfo) | (BasicInfo, Survey) | (Survey, Chat)
        )
    }

    /// Whether this stage is terminal (the chat has taken over).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Chat)
    }

    /// Get the next stage in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStage> {
        use OnboardingStage::*;
        match self {
            Welcome => Some(BasicInfo),
            BasicInfo => Some(Survey),
            Survey => Some(Chat),
            Chat => None,
        }
    }
}

impl std::fmt::Display for OnboardingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::BasicInfo => "basic_info",
            Self::Survey => "survey",
            Self::Chat => "chat",
        };
        write!(f, "{s}")
    }
}
