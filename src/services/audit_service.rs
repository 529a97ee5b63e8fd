use {
    super::{
        enrichment::{SystemUserDefaults, enrich},
        unit_of_work::{DualWriteUnitOfWork, IndexStatus},
    },
    crate::domain::{
        action::ActionRegistry,
        context::{ActorContext, Capability, PermissionScope},
        error::AuditError,
        event::{AuditLogView, SearchPage, SearchQuery},
        id::AuditLogId,
        ports::{DurableStore, IdentityProvider, PermissionGate, SearchIndex},
        schema::{StoredRecord, normalize, project},
    },
    chrono::Utc,
    std::sync::Arc,
};

/// Whether audit logging is switched on for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceMode {
    #[default]
    Enabled,
    /// `create` becomes a no-op success. Reads still work.
    Disabled,
}

#[derive(Debug)]
pub enum CreateResult {
    /// Durably recorded and indexed.
    Indexed(AuditLogView),
    /// Durably recorded; the index write is queued for retry.
    IndexDeferred(AuditLogView),
    /// Audit logging is disabled; nothing was written.
    Disabled,
}

impl CreateResult {
    pub fn view(&self) -> Option<&AuditLogView> {
        match self {
            Self::Indexed(view) | Self::IndexDeferred(view) => Some(view),
            Self::Disabled => None,
        }
    }

    pub fn into_view(self) -> Option<AuditLogView> {
        match self {
            Self::Indexed(view) | Self::IndexDeferred(view) => Some(view),
            Self::Disabled => None,
        }
    }
}

/// Everything the service needs, built once at startup.
pub struct AuditLogServiceParams {
    pub registry: Arc<ActionRegistry>,
    pub store: Arc<dyn DurableStore>,
    pub index: Arc<dyn SearchIndex>,
    pub identities: Arc<dyn IdentityProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub unit_of_work: DualWriteUnitOfWork,
    pub system_user: SystemUserDefaults,
    pub mode: ServiceMode,
}

pub struct AuditLogService {
    registry: Arc<ActionRegistry>,
    store: Arc<dyn DurableStore>,
    index: Arc<dyn SearchIndex>,
    identities: Arc<dyn IdentityProvider>,
    permissions: Arc<dyn PermissionGate>,
    unit_of_work: DualWriteUnitOfWork,
    system_user: SystemUserDefaults,
    mode: ServiceMode,
}

impl AuditLogService {
    pub fn new(params: AuditLogServiceParams) -> Self {
        Self {
            registry: params.registry,
            store: params.store,
            index: params.index,
            identities: params.identities,
            permissions: params.permissions,
            unit_of_work: params.unit_of_work,
            system_user: params.system_user,
            mode: params.mode,
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    fn require(
        &self,
        actor: &ActorContext,
        capability: Capability,
        scope: PermissionScope,
    ) -> Result<(), AuditError> {
        if self.permissions.check(actor, capability, scope) {
            return Ok(());
        }
        tracing::warn!(actor = %actor.actor_id, %capability, "permission denied");
        Err(AuditError::PermissionDenied {
            actor: actor.actor_id.to_string(),
            capability,
        })
    }

    /// Record an event: permission check, enrichment, validation, dual
    /// write, projection. Everything before the durable write is free of
    /// side effects.
    #[tracing::instrument(
        name = "audit_log.create",
        skip_all,
        fields(actor = %actor.actor_id, audit_id = tracing::field::Empty)
    )]
    pub async fn create(
        &self,
        actor: &ActorContext,
        payload: serde_json::Value,
    ) -> Result<CreateResult, AuditError> {
        if self.mode == ServiceMode::Disabled {
            tracing::debug!("audit logging disabled, skipping create");
            return Ok(CreateResult::Disabled);
        }

        self.require(actor, Capability::Create, PermissionScope::Collection)?;

        let enriched = enrich(&*self.identities, actor, &self.system_user, payload).await?;
        let event = normalize(enriched, &self.registry, Utc::now()).inspect_err(|e| {
            tracing::info!(error = %e, "rejected audit event");
        })?;

        let outcome = self.unit_of_work.commit(&event).await?;
        tracing::Span::current().record("audit_id", tracing::field::display(outcome.record.id));

        let view = project(&StoredRecord::Durable(outcome.record), &self.registry)?;
        tracing::info!(
            action = %view.action,
            resource_type = %view.resource_type(),
            resource_id = %view.resource_id(),
            "audit event recorded"
        );

        Ok(match outcome.index {
            IndexStatus::Indexed => CreateResult::Indexed(view),
            IndexStatus::Deferred(_) => CreateResult::IndexDeferred(view),
        })
    }

    /// Fetch one event from the durable store.
    #[tracing::instrument(name = "audit_log.read", skip_all, fields(actor = %actor.actor_id, audit_id = %id))]
    pub async fn read(&self, actor: &ActorContext, id: AuditLogId) -> Result<AuditLogView, AuditError> {
        self.require(actor, Capability::Read, PermissionScope::Record(id))?;

        let record = self.store.get(id).await?.ok_or(AuditError::NotFound(id.as_uuid()))?;
        project(&StoredRecord::Durable(record), &self.registry)
    }

    /// Query the search index. Results may lag behind the durable store.
    #[tracing::instrument(name = "audit_log.search", skip_all, fields(actor = %actor.actor_id))]
    pub async fn search(
        &self,
        actor: &ActorContext,
        query: SearchQuery,
    ) -> Result<SearchPage<AuditLogView>, AuditError> {
        self.require(actor, Capability::Search, PermissionScope::Collection)?;

        let page = self.index.search(query).await?;
        let hits = page
            .hits
            .into_iter()
            .map(|doc| project(&StoredRecord::Indexed(doc), &self.registry))
            .collect::<Result<_, _>>()?;
        Ok(SearchPage {
            total: page.total,
            hits,
        })
    }
}
