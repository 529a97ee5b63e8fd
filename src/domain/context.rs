use {
    super::id::{ActorId, AuditLogId},
    derive_more::Display,
    serde::{Deserialize, Serialize},
};

/// What an actor is trying to do with audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[display("create")]
    Create,
    #[display("read")]
    Read,
    #[display("search")]
    Search,
}

/// What the permission check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionScope {
    /// The audit log collection as a whole (create, search).
    Collection,
    /// One specific event.
    Record(AuditLogId),
}

/// Ambient attributes of the request that triggered the event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub remote_ip: Option<String>,
    pub session: Option<String>,
    pub request_id: Option<String>,
}

/// The caller: who they are plus where the request came from. Name and
/// email always come from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub actor_id: ActorId,
    pub request: RequestContext,
}

impl ActorContext {
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            request: RequestContext::default(),
        }
    }

    pub fn system() -> Self {
        Self::new(ActorId::system())
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn is_system(&self) -> bool {
        self.actor_id.is_system()
    }
}
