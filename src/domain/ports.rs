//! Boundaries to the collaborators this crate does not own.

use {
    super::context::{ActorContext, Capability, PermissionScope},
    super::error::AuditError,
    super::event::{AuditLogRecord, IndexDocument, NewAuditLogRecord, SearchPage, SearchQuery},
    super::id::{ActorId, AuditLogId},
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Authoritative storage. Inserts generate the id.
pub trait DurableStore: Send + Sync {
    fn insert(
        &self,
        record: NewAuditLogRecord,
    ) -> BoxFuture<'_, Result<AuditLogRecord, AuditError>>;

    fn get(&self, id: AuditLogId) -> BoxFuture<'_, Result<Option<AuditLogRecord>, AuditError>>;
}

/// Derived, eventually consistent search index.
pub trait SearchIndex: Send + Sync {
    /// Create or replace the document with the same id.
    fn upsert(&self, doc: IndexDocument) -> BoxFuture<'_, Result<(), AuditError>>;

    fn search(
        &self,
        query: SearchQuery,
    ) -> BoxFuture<'_, Result<SearchPage<IndexDocument>, AuditError>>;
}

/// What the identity provider knows about an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActor {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
}

pub trait IdentityProvider: Send + Sync {
    /// Fails with [`AuditError::ActorNotFound`] for unknown actors.
    fn resolve(&self, actor: ActorId) -> BoxFuture<'_, Result<ResolvedActor, AuditError>>;
}

pub trait PermissionGate: Send + Sync {
    fn check(&self, actor: &ActorContext, capability: Capability, scope: PermissionScope) -> bool;
}
