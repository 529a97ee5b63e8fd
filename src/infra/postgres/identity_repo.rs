use {
    crate::domain::{
        error::AuditError,
        id::ActorId,
        ports::{BoxFuture, IdentityProvider, ResolvedActor},
    },
    sqlx::PgPool,
};

/// Resolves actors against the platform's `accounts_user` table. The table
/// belongs to the identity subsystem; this crate only reads it.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn resolve_inner(&self, actor: ActorId) -> Result<ResolvedActor, AuditError> {
        let row = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
            "SELECT id::text, email, username FROM accounts_user WHERE id::text = $1",
        )
        .bind(actor.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let (id, email, username) =
            row.ok_or_else(|| AuditError::ActorNotFound(actor.into_inner()))?;
        Ok(ResolvedActor {
            id,
            email,
            username,
        })
    }
}

impl IdentityProvider for PgIdentityProvider {
    fn resolve(&self, actor: ActorId) -> BoxFuture<'_, Result<ResolvedActor, AuditError>> {
        Box::pin(async move { self.resolve_inner(actor).await })
    }
}
