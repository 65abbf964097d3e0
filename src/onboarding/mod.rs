//! Onboarding — the linear welcome → basic info → survey → chat flow.
//!
//! Each stage produces data for the next one: basic info feeds the survey
//! stage, and basic info plus the lifestyle answers become the `ChatSeed`
//! that opens the coaching conversation.

pub mod flow;
pub mod model;
pub mod state;

pub use flow::{ChatSeed, OnboardingFlow, SurveyStep};
pub use model::{BasicInfo, BasicInfoField, GENDER_OPTIONS};
pub use state::OnboardingStage;
