use {
    super::error::{AuditError, ValidationError},
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::str::FromStr,
    uuid::Uuid,
};

/// Reserved actor id for automated work not attributable to a person.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Audit log event identifier. Generated server-side as a UUIDv7, so ids
/// also sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLogId(Uuid);

impl AuditLogId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for AuditLogId {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| {
            ValidationError::Malformed(format!("audit log id must be a UUID, got {s}: {e}")).into()
        })
    }
}

/// Identity of whoever triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Result<Self, AuditError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::MissingField("user.id").into());
        }
        Ok(Self(id))
    }

    pub fn system() -> Self {
        Self(SYSTEM_ACTOR_ID.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_ACTOR_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
