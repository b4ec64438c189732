use std::path::PathBuf;

use thiserror::Error;

/// Failures of the persisted snapshot file. All of them are fatal for the
/// operation that triggered the store access.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse snapshot in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported text encoding `{0}`")]
    UnsupportedEncoding(String),

    #[error("{encoding}: {detail}")]
    Encoding {
        encoding: &'static str,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum FormError {
    /// Malformed or missing options. Raised before any registry mutation.
    #[error("invalid options: {0}")]
    ConfigShape(String),

    #[error("group key `{0}` already exists")]
    DuplicateKey(String),

    #[error("group key must be a string, got {0}")]
    TypeKey(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("event binding `{event}` is not a callable handler: {reason}")]
    EventHandlerType { event: String, reason: String },

    /// Registry, view, and store disagree about a group's contents.
    #[error("form state diverged: {0}")]
    Inconsistent(String),

    #[error("instance is no longer registered")]
    UnknownInstance,

    #[error("form engine has been dropped")]
    EngineDropped,
}

pub type Result<T, E = FormError> = std::result::Result<T, E>;

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
