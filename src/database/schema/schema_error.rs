use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown type {kind:?} for field {field:?}")]
    UnknownFieldType { field: String, kind: String },
    #[error("invalid options for field {field:?}: {reason}")]
    InvalidFieldOptions { field: String, reason: String },
    #[error("expected a collection object or an array of collections")]
    UnexpectedShape,
    #[error("invalid collection definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
}
