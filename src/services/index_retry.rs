use {
    super::unit_of_work::DeferredIndexWrite,
    crate::domain::ports::SearchIndex,
    std::{cmp::Ordering, collections::BinaryHeap, sync::Arc, time::Duration},
    tokio::{
        sync::{mpsc, watch},
        time::Instant,
    },
};

const MAX_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total failed attempts (including the inline one) before giving up.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: `base * 2^(attempts - 1)`, capped.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1 << exp)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }
}

struct Scheduled {
    due: Instant,
    seq: u64,
    job: DeferredIndexWrite,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the BinaryHeap pops the earliest due job first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Drain the deferred index queue, retrying each write with backoff until
/// it succeeds or the attempt budget runs out. Jobs that give up are logged
/// and left for out-of-band reconciliation.
pub async fn run_index_retry_worker(
    index: Arc<dyn SearchIndex>,
    mut queue: mpsc::UnboundedReceiver<DeferredIndexWrite>,
    policy: RetryPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("index retry worker started");

    let mut pending: BinaryHeap<Scheduled> = BinaryHeap::new();
    let mut seq = 0u64;
    let mut open = true;

    loop {
        if !open && pending.is_empty() {
            tracing::info!("index retry queue closed and drained");
            return;
        }

        let next_due = pending.peek().map(|s| s.due);

        tokio::select! {
            _ = shutdown.changed() => {
                if !pending.is_empty() {
                    tracing::warn!(count = pending.len(), "index retry worker stopping with pending writes");
                }
                tracing::info!("index retry worker shutting down");
                return;
            }
            job = queue.recv(), if open => match job {
                Some(job) if job.attempts >= policy.max_attempts => {
                    tracing::error!(audit_id = %job.id, attempts = job.attempts, "index write budget already spent, left for reconciliation");
                }
                Some(job) => {
                    let due = Instant::now() + policy.delay_for(job.attempts);
                    seq += 1;
                    pending.push(Scheduled { due, seq, job });
                }
                None => open = false,
            },
            _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                let now = Instant::now();
                while pending.peek().is_some_and(|s| s.due <= now) {
                    // A closed sender counts as shutdown, same as `changed()` above.
                    if shutdown.has_changed().unwrap_or(true) {
                        break;
                    }
                    let Some(Scheduled { job, .. }) = pending.pop() else { break };
                    if let Some(job) = retry_once(&*index, job, &policy).await {
                        let due = Instant::now() + policy.delay_for(job.attempts);
                        seq += 1;
                        pending.push(Scheduled { due, seq, job });
                    }
                }
            }
        }
    }
}

/// One retry. Returns the job back if it should be tried again.
async fn retry_once(
    index: &dyn SearchIndex,
    mut job: DeferredIndexWrite,
    policy: &RetryPolicy,
) -> Option<DeferredIndexWrite> {
    match index.upsert(job.doc.clone()).await {
        Ok(()) => {
            tracing::info!(audit_id = %job.id, attempt = job.attempts + 1, "deferred index write succeeded");
            None
        }
        Err(e) => {
            job.attempts += 1;
            job.last_error = e.to_string();
            if job.attempts >= policy.max_attempts {
                tracing::error!(
                    audit_id = %job.id,
                    attempts = job.attempts,
                    error = %job.last_error,
                    "giving up on index write, left for reconciliation"
                );
                None
            } else {
                tracing::warn!(audit_id = %job.id, attempt = job.attempts, error = %e, "index write retry failed");
                Some(job)
            }
        }
    }
}
