use {super::context::Capability, thiserror::Error, uuid::Uuid};

/// Payload problems detected before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid action '{action}' for resource type '{resource_type}'")]
    InvalidAction {
        action: String,
        resource_type: String,
    },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("permission denied: {actor} lacks '{capability}'")]
    PermissionDenied { actor: String, capability: Capability },

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("actor not found: {0}")]
    ActorNotFound(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("index write deferred for {id}: {reason}")]
    IndexWriteDeferred { id: Uuid, reason: String },

    #[error("audit log not found: {0}")]
    NotFound(Uuid),

    #[error("read integrity: record {id} is missing '{field}'")]
    ReadIntegrity { id: String, field: &'static str },

    #[error("duplicate action: {0}")]
    DuplicateAction(String),

    #[error("invalid action name '{0}', expected <resource>.<verb>")]
    InvalidActionName(String),

    #[error("invalid template for '{action}': {reason}")]
    InvalidTemplate { action: String, reason: String },

    #[error("unknown placeholder '{field}' in template for '{action}'")]
    UnknownPlaceholder { action: String, field: String },

    #[error("template for '{action}' needs '{field}' but it was not provided")]
    TemplateFieldMissing { action: String, field: String },

    #[error("search index: {0}")]
    Index(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),
}

impl AuditError {
    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Database(_) | Self::Index(_))
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        Self::Index(err.to_string())
    }
}
