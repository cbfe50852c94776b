use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The path names a collection or field that does not exist, or is not usable as written.
    SchemaLookup,
    /// The path itself is malformed or not allowed.
    PathSyntax,
    /// A field's options could not be used.
    OptionsInitialization,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionCause {
    #[error("field is not allowed to be used in filters")]
    DisallowedField,
    #[error("empty field path")]
    EmptyPath,
    #[error("unknown modifier in {0:?}")]
    UnknownModifier(String),
    #[error("invalid @collection field path")]
    InvalidCollectionPath,
    #[error("max nested relations reached at {0:?}")]
    MaxNestedRelations(String),
    #[error("unknown collection {0:?}")]
    UnknownCollection(String),
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("field {0:?} is not a relation")]
    NotARelation(String),
    #[error("invalid back relation {0:?}")]
    InvalidBackRelation(String),
    #[error("failed to initialize options of field {field:?}: {reason}")]
    OptionsInitialization { field: String, reason: String },
}

impl ResolutionCause {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResolutionCause::DisallowedField
            | ResolutionCause::EmptyPath
            | ResolutionCause::UnknownModifier(_)
            | ResolutionCause::InvalidCollectionPath
            | ResolutionCause::MaxNestedRelations(_) => ErrorCategory::PathSyntax,
            ResolutionCause::UnknownCollection(_)
            | ResolutionCause::UnknownField(_)
            | ResolutionCause::NotARelation(_)
            | ResolutionCause::InvalidBackRelation(_) => ErrorCategory::SchemaLookup,
            ResolutionCause::OptionsInitialization { .. } => ErrorCategory::OptionsInitialization,
        }
    }
}

/// Failure to resolve a field path, carrying the path exactly as it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve field {path:?}: {cause}")]
pub struct ResolutionError {
    pub path: String,
    #[source]
    pub cause: ResolutionCause,
}

impl ResolutionError {
    pub fn new(path: impl Into<String>, cause: ResolutionCause) -> Self {
        Self { path: path.into(), cause }
    }

    pub fn category(&self) -> ErrorCategory {
        self.cause.category()
    }
}
