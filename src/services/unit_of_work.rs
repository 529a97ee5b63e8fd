use {
    crate::domain::{
        error::AuditError,
        event::{AuditLogRecord, CanonicalEvent, IndexDocument},
        id::AuditLogId,
        ports::{DurableStore, SearchIndex},
    },
    std::sync::Arc,
    tokio::sync::mpsc,
};

/// An index write that has to happen later.
#[derive(Debug, Clone)]
pub struct DeferredIndexWrite {
    pub id: AuditLogId,
    pub doc: IndexDocument,
    /// Failed attempts so far.
    pub attempts: u32,
    pub last_error: String,
}

/// Sending half of the deferred index queue. Cheap to clone.
#[derive(Clone)]
pub struct DeferredIndexQueue {
    tx: mpsc::UnboundedSender<DeferredIndexWrite>,
}

impl DeferredIndexQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeferredIndexWrite>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn defer(&self, job: DeferredIndexWrite) {
        let id = job.id;
        if self.tx.send(job).is_err() {
            tracing::error!(audit_id = %id, "index retry queue closed, document left for reconciliation");
        }
    }
}

/// Hands the index write to the retry queue if the commit future is dropped
/// between the durable write and the index write.
struct PendingIndexGuard<'a> {
    queue: &'a DeferredIndexQueue,
    job: Option<DeferredIndexWrite>,
}

impl<'a> PendingIndexGuard<'a> {
    fn new(queue: &'a DeferredIndexQueue, id: AuditLogId, doc: IndexDocument) -> Self {
        Self {
            queue,
            job: Some(DeferredIndexWrite {
                id,
                doc,
                attempts: 0,
                last_error: "cancelled before the index write completed".into(),
            }),
        }
    }

    fn disarm(mut self) {
        self.job = None;
    }

    fn defer(mut self, error: String) {
        if let Some(mut job) = self.job.take() {
            job.attempts += 1;
            job.last_error = error;
            self.queue.defer(job);
        }
    }
}

impl Drop for PendingIndexGuard<'_> {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            tracing::warn!(audit_id = %job.id, "commit cancelled after durable write, deferring index write");
            self.queue.defer(job);
        }
    }
}

#[derive(Debug)]
pub enum IndexStatus {
    Indexed,
    /// Holds an [`AuditError::IndexWriteDeferred`]. Never surfaced as a
    /// failure to the caller.
    Deferred(AuditError),
}

#[derive(Debug)]
pub struct CommitOutcome {
    pub record: AuditLogRecord,
    pub index: IndexStatus,
}

/// Writes one event to the durable store, then to the search index.
///
/// The durable store is authoritative: if it fails nothing is indexed and
/// the error is [`AuditError::Persistence`]. Once the durable write has
/// succeeded the commit succeeds; an index failure only defers the index
/// write to the retry queue.
#[derive(Clone)]
pub struct DualWriteUnitOfWork {
    store: Arc<dyn DurableStore>,
    index: Arc<dyn SearchIndex>,
    deferred: DeferredIndexQueue,
}

impl DualWriteUnitOfWork {
    pub fn new(
        store: Arc<dyn DurableStore>,
        index: Arc<dyn SearchIndex>,
        deferred: DeferredIndexQueue,
    ) -> Self {
        Self {
            store,
            index,
            deferred,
        }
    }

    pub async fn commit(&self, event: &CanonicalEvent) -> Result<CommitOutcome, AuditError> {
        let new_record = event.to_new_record()?;

        let record = self.store.insert(new_record).await.map_err(|e| {
            tracing::error!(action = %event.action, error = %e, "durable write failed");
            AuditError::Persistence(e.to_string())
        })?;
        let id = record.audit_id();

        let doc = record.to_index_document();
        let guard = PendingIndexGuard::new(&self.deferred, id, doc.clone());

        let index = match self.index.upsert(doc).await {
            Ok(()) => {
                guard.disarm();
                IndexStatus::Indexed
            }
            Err(e) => {
                let reason = e.to_string();
                guard.defer(reason.clone());
                let deferred = AuditError::IndexWriteDeferred { id: id.as_uuid(), reason };
                tracing::warn!(audit_id = %id, error = %deferred, "index write failed, queued for retry");
                IndexStatus::Deferred(deferred)
            }
        };

        Ok(CommitOutcome { record, index })
    }
}
