use {
    crate::{
        domain::{
            error::PipelineError,
            store::{NotificationQueue, OrderStore},
        },
        services::notifier::NotificationDispatcher,
    },
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

pub const CLAIM_BATCH: i64 = 10;
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Jobs in `processing` longer than this are assumed orphaned by a crashed worker.
pub fn stale_after() -> chrono::Duration {
    chrono::Duration::minutes(2)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub sent: usize,
    pub dropped: usize,
    pub retried: usize,
}

/// Poll for due notification jobs and deliver them.
pub async fn run_worker(
    queue: Arc<dyn NotificationQueue>,
    store: Arc<dyn OrderStore>,
    dispatcher: NotificationDispatcher,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(enabled = dispatcher.is_enabled(), "notification worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("notification worker shutting down");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if let Err(e) = poll_once(&*queue, &*store, &dispatcher).await {
            tracing::error!(error = %e, "worker poll error");
        }
    }
}

pub async fn poll_once(
    queue: &dyn NotificationQueue,
    store: &dyn OrderStore,
    dispatcher: &NotificationDispatcher,
) -> Result<PollSummary, PipelineError> {
    let jobs = queue.claim(CLAIM_BATCH).await?;
    let mut summary = PollSummary::default();

    for job in jobs {
        match dispatcher.deliver(store, &job).await {
            Ok(receipt) => {
                tracing::info!(job_id = %job.id, order_id = %job.order_id, audience = %job.audience, sid = %receipt.sid, "notification sent");
                queue.complete(job.id).await?;
                summary.sent += 1;
            }
            Err(e) if !e.is_retryable() => {
                tracing::warn!(job_id = %job.id, order_id = %job.order_id, audience = %job.audience, error = %e, "notification dropped (no retry)");
                queue.complete(job.id).await?;
                summary.dropped += 1;
            }
            Err(e) => {
                if job.attempts + 1 >= job.max_attempts {
                    tracing::error!(job_id = %job.id, order_id = %job.order_id, audience = %job.audience, error = %e, "notification failed permanently, moved to dead letters");
                } else {
                    tracing::warn!(job_id = %job.id, audience = %job.audience, attempt = job.attempts + 1, error = %e, "notification failed, scheduling retry");
                }
                queue.fail(job.id, e.to_string()).await?;
                summary.retried += 1;
            }
        }
    }

    Ok(summary)
}

/// Periodically reset jobs stuck in 'processing' back to 'pending'.
pub async fn run_reaper(queue: Arc<dyn NotificationQueue>, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("stale job reaper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("stale job reaper shutting down");
                return;
            }
            _ = tokio::time::sleep(REAP_INTERVAL) => {}
        }

        match queue.reap_stale(stale_after()).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "reaped stale jobs"),
            Err(e) => tracing::error!(error = %e, "reaper error"),
        }
    }
}
