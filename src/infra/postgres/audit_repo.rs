use {
    crate::domain::{
        error::AuditError,
        event::{AuditLogRecord, NewAuditLogRecord},
        id::AuditLogId,
        ports::{BoxFuture, DurableStore},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

type AuditRow = (
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    String,
    String,
    Option<serde_json::Value>,
    i32,
);

fn into_record(row: AuditRow) -> AuditLogRecord {
    let (id, created, updated, action, resource_type, user_id, json, version) = row;
    AuditLogRecord {
        id,
        created,
        updated,
        action,
        resource_type,
        user_id,
        json,
        version,
    }
}

pub async fn insert_audit_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: AuditLogId,
    record: &NewAuditLogRecord,
) -> Result<AuditLogRecord, AuditError> {
    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        INSERT INTO audit_logs_metadata
            (id, created, updated, action, resource_type, user_id, json, version_id)
        VALUES ($1, $2, $2, $3, $4, $5, $6, 1)
        RETURNING id, created, updated, action, resource_type, user_id, json, version_id
        "#,
    )
    .bind(id.as_uuid())
    .bind(record.created)
    .bind(&record.action)
    .bind(&record.resource_type)
    .bind(&record.user_id)
    .bind(&record.json)
    .fetch_one(&mut **tx)
    .await?;

    Ok(into_record(row))
}

pub async fn get_audit_log(
    pool: &PgPool,
    id: AuditLogId,
) -> Result<Option<AuditLogRecord>, AuditError> {
    let row = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, created, updated, action, resource_type, user_id, json, version_id
        FROM audit_logs_metadata
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(into_record))
}

/// Durable store backed by the `audit_logs_metadata` table.
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_inner(&self, record: NewAuditLogRecord) -> Result<AuditLogRecord, AuditError> {
        let mut tx = self.pool.begin().await?;
        let stored = insert_audit_log(&mut tx, AuditLogId::generate(), &record).await?;
        tx.commit().await?;
        Ok(stored)
    }
}

impl DurableStore for PgAuditStore {
    fn insert(
        &self,
        record: NewAuditLogRecord,
    ) -> BoxFuture<'_, Result<AuditLogRecord, AuditError>> {
        Box::pin(async move { self.insert_inner(record).await })
    }

    fn get(&self, id: AuditLogId) -> BoxFuture<'_, Result<Option<AuditLogRecord>, AuditError>> {
        Box::pin(async move { get_audit_log(&self.pool, id).await })
    }
}
