use {
    crate::domain::{
        error::PipelineError,
        notification::{Audience, JobStatus, NewNotificationJob, NotificationJob},
        provider::BoxFuture,
        store::NotificationQueue,
    },
    chrono::{DateTime, Duration, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

const JOB_COLUMNS: &str =
    "id, order_id, audience, recipient, status, attempts, max_attempts, last_error, scheduled_at";

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    order_id: Uuid,
    audience: String,
    recipient: String,
    status: String,
    attempts: i32,
    max_attempts: i32,
    last_error: Option<String>,
    scheduled_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for NotificationJob {
    type Error = PipelineError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(NotificationJob {
            id: row.id,
            order_id: row.order_id,
            audience: Audience::from_parts(&row.audience, &row.recipient)?,
            status: JobStatus::try_from(row.status.as_str())?,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            scheduled_at: row.scheduled_at,
        })
    }
}

#[derive(Clone)]
pub struct PgNotificationQueue {
    pool: PgPool,
}

impl PgNotificationQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn enqueue_inner(&self, job: NewNotificationJob) -> Result<bool, PipelineError> {
        let inserted: Option<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO notification_jobs (id, order_id, audience, recipient)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id, audience, recipient) DO NOTHING
            RETURNING true
            "#,
        )
        .bind(job.id)
        .bind(job.order_id)
        .bind(job.audience.as_str())
        .bind(job.audience.recipient())
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    /// SKIP LOCKED keeps concurrent workers off each other's rows.
    async fn claim_inner(&self, limit: i64) -> Result<Vec<NotificationJob>, PipelineError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE notification_jobs
            SET status = 'processing', updated_at = now()
            WHERE id IN (
                SELECT id FROM notification_jobs
                WHERE status = 'pending' AND scheduled_at <= now()
                ORDER BY scheduled_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.into_iter().map(NotificationJob::try_from).collect()
    }

    async fn complete_inner(&self, job_id: Uuid) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE notification_jobs SET status = 'completed', updated_at = now() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_inner(&self, job_id: Uuid, error: String) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET attempts = attempts + 1,
                last_error = $2,
                status = CASE
                    WHEN attempts + 1 >= max_attempts THEN 'failed'
                    ELSE 'pending'
                END,
                scheduled_at = CASE
                    WHEN attempts + 1 >= max_attempts THEN scheduled_at
                    ELSE now() + make_interval(secs => power(2, attempts + 1)::int)
                END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(&error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reap_stale_inner(&self, older_than: Duration) -> Result<u64, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_jobs
            SET status = 'pending', updated_at = now()
            WHERE status = 'processing'
              AND updated_at < now() - make_interval(secs => $1)
            "#,
        )
        .bind(older_than.num_milliseconds() as f64 / 1000.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn dead_letters_inner(&self, limit: i64) -> Result<Vec<NotificationJob>, PipelineError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM notification_jobs \
             WHERE status = 'failed' ORDER BY updated_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationJob::try_from).collect()
    }
}

impl NotificationQueue for PgNotificationQueue {
    fn enqueue(&self, job: NewNotificationJob) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(self.enqueue_inner(job))
    }

    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>> {
        Box::pin(self.claim_inner(limit))
    }

    fn complete(&self, job_id: Uuid) -> BoxFuture<'_, Result<(), PipelineError>> {
        Box::pin(self.complete_inner(job_id))
    }

    fn fail(&self, job_id: Uuid, error: String) -> BoxFuture<'_, Result<(), PipelineError>> {
        Box::pin(self.fail_inner(job_id, error))
    }

    fn reap_stale(&self, older_than: Duration) -> BoxFuture<'_, Result<u64, PipelineError>> {
        Box::pin(self.reap_stale_inner(older_than))
    }

    fn dead_letters(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>> {
        Box::pin(self.dead_letters_inner(limit))
    }
}
