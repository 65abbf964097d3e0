//! Coaching conversation: greeting, three follow-up questions, plan
//! initialization, then free chat with the backend.

pub mod controller;
pub mod message;
pub mod prompts;

pub use controller::{ConversationSession, ConversationStage, SessionStatus, SubmitOutcome};
pub use message::{ChatMessage, MessageId, Sender};
