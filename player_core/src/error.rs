// Typed errors with thiserror. Surface meaningful messages to JS.
// Nothing on the per-tick path returns these; they cover config loading and host misuse.

use thiserror::Error;

/// Player error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Layer {layer_id} is missing displayTime")]
    MissingDisplayTime { layer_id: String },

    #[error("Layer {layer_id}: invalid {field} value {value}")]
    InvalidTimeValue {
        layer_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Layer {layer_id}: unknown layer type {kind}")]
    UnknownLayerKind { layer_id: String, kind: String },

    #[error("Duplicate layer id: {0}")]
    DuplicateLayer(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Event delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        PlayerError::Serialization(err.to_string())
    }
}
