//! Error types for the diet coach.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    #[error("Onboarding error: {0}")]
    Flow(#[from] FlowError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the coaching backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Malformed block payload: {0}")]
    Blocks(#[from] BlockError),
}

/// Content block decoding and validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    #[error("Payload is not a block list: {0}")]
    MalformedPayload(String),

    #[error("Missing or non-string block type")]
    MissingType,

    #[error("Unknown block type: {0}")]
    UnknownType(String),

    #[error("Invalid {kind} block: {reason}")]
    InvalidShape { kind: String, reason: String },

    #[error("Chart '{title}' has {labels} labels but {values} values")]
    ChartLengthMismatch {
        title: String,
        labels: usize,
        values: usize,
    },

    #[error("Table '{title}' row {row} has {cells} cells, expected {headers}")]
    TableRowMismatch {
        title: String,
        row: usize,
        cells: usize,
        headers: usize,
    },

    #[error("{kind} block has non-finite {field}")]
    NonFinite { kind: String, field: String },

    #[error("Coordinate out of range: ({lat}, {lng})")]
    CoordinateOutOfRange { lat: f64, lng: f64 },
}

/// Static map image resolution errors. Always recovered by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapImageError {
    #[error("Static map API key is empty")]
    MissingKey,

    #[error("Map center is not a valid coordinate")]
    InvalidCenter,

    #[error("Failed to build static map URL: {0}")]
    Url(String),
}

/// Survey sequencing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("'{value}' is not an option for {key} (expected one of: {options})")]
    InvalidChoice {
        key: String,
        value: String,
        options: String,
    },

    #[error("Survey is already complete")]
    AlreadyComplete,

    #[error("Survey has no questions")]
    Empty,

    #[error("Missing answer for {0}")]
    MissingAnswer(String),
}

/// Onboarding flow errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Cannot {action} during the {stage} stage")]
    InvalidStage { stage: String, action: String },

    #[error("Invalid basic info field {field}: {reason}")]
    InvalidBasicInfo { field: String, reason: String },

    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),
}

/// Conversation session errors surfaced to the caller.
///
/// Backend failures never show up here; they are appended to the history
/// as bot messages instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("A request is already in flight")]
    Busy,

    #[error("Empty message")]
    EmptyInput,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
