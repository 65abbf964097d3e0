//! Diet Coach — onboarding and structured chat client for an AI diet coach.

pub mod blocks;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod session;
pub mod survey;
