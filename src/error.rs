//! Error types for the codec.
//!
//! Per-field encode/decode problems are plain `String`s collected by an
//! [`ErrorSink`](crate::codec::ErrorSink); the types here are the fatal ones.

use thiserror::Error;

/// Repository resolution failure. Always fatal: no partial schema is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A structure reference points at an identity the repository does not declare.
    #[error("dangling {kind} reference: id {id} not found")]
    DanglingReference { kind: &'static str, id: u32 },

    /// A component or group (indirectly) contains itself.
    #[error("cyclic {kind} reference: id {id}")]
    CyclicReference { kind: &'static str, id: u32 },

    #[error("No header in message: {0}")]
    MissingHeader(String),

    #[error("No trailer in message: {0}")]
    MissingTrailer(String),
}

/// Transport framing failure while splitting raw bytes into tag/value pairs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("message must start with 8=<BeginString>")]
    MissingBeginString,

    #[error("BeginString mismatch: expected {expected}, got {actual}")]
    BeginStringMismatch { expected: String, actual: String },

    #[error("invalid BodyLength (9): {0}")]
    InvalidBodyLength(String),

    #[error("invalid CheckSum (10): expected {expected:03}, got {actual}")]
    CheckSumMismatch { expected: u32, actual: String },

    #[error("malformed field at byte {0}")]
    MalformedField(usize),

    #[error("missing MsgType (35)")]
    MissingMsgType,

    #[error("invalid NumInGroup ({tag}): {value}")]
    InvalidGroupCount { tag: u32, value: String },

    #[error("group {tag} declares {declared} entries but has {actual}")]
    GroupCountMismatch { tag: u32, declared: usize, actual: usize },

    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}

/// Top-level error returned by [`Codec`](crate::Codec) operations.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to decode message: {0}")]
    Wire(#[from] WireError),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// Semantic validation failed: message name, offending tags and scenario.
    #[error("msgType [{msg_type}], tags [{}], scenario [{scenario}]", join_tags(.tags))]
    Validation {
        msg_type: String,
        tags: Vec<u32>,
        scenario: String,
        details: Vec<String>,
    },

    #[error("Failed to encode message due to following errors:\n{}", bullet_list(.0))]
    Encode(Vec<String>),

    #[error("Failed to decode message due to following errors:\n{}", bullet_list(.0))]
    Decode(Vec<String>),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using CodecError.
pub type Result<T> = std::result::Result<T, CodecError>;

fn join_tags(tags: &[u32]) -> String {
    tags.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn bullet_list(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!(" - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
