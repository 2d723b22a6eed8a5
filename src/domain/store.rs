use {
    super::error::PipelineError,
    super::notification::{NewNotificationJob, NotificationJob},
    super::order::{NewOrder, NewOrderItem, Order, OrderItem, ProviderReference},
    super::provider::BoxFuture,
    super::webhook::{OrderLookup, WebhookRecord},
    chrono::Duration,
    uuid::Uuid,
};

/// Persistence for orders, their items and the webhook audit log.
///
/// Every write is narrow and field-scoped; nothing rewrites a whole order.
pub trait OrderStore: Send + Sync {
    fn insert_order(&self, order: NewOrder) -> BoxFuture<'_, Result<Order, PipelineError>>;

    /// Bulk insert, all or nothing.
    fn insert_items(
        &self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>>;

    /// Compensating delete; items go with it.
    fn delete_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<bool, PipelineError>>;

    fn get_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, PipelineError>>;

    /// Items newest-first by creation.
    fn list_items(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>>;

    fn attach_payment_link(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>>;

    /// Also records the channel as the order's payment method.
    fn attach_payment_request(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>>;

    /// Orders with `payment_status = pending` matching one identifier. At most
    /// two are returned, enough to tell "exactly one" from "ambiguous".
    fn find_pending(&self, lookup: OrderLookup) -> BoxFuture<'_, Result<Vec<Order>, PipelineError>>;

    /// Atomic pending → paid (and status → processing) plus audit append.
    /// Returns `false`, writing nothing, if the order was no longer pending.
    fn mark_paid(&self, record: WebhookRecord) -> BoxFuture<'_, Result<bool, PipelineError>>;

    fn webhook_log(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<WebhookRecord>, PipelineError>>;
}

/// Outbound notification jobs: at-least-once with backoff and dead letters.
pub trait NotificationQueue: Send + Sync {
    /// Returns `true` if inserted, `false` if the same (order, recipient) job exists.
    fn enqueue(&self, job: NewNotificationJob) -> BoxFuture<'_, Result<bool, PipelineError>>;

    /// Claim up to `limit` due jobs, moving them to `processing`.
    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>>;

    fn complete(&self, job_id: Uuid) -> BoxFuture<'_, Result<(), PipelineError>>;

    /// Record a failure. Exponential backoff; `failed` once attempts run out.
    fn fail(&self, job_id: Uuid, error: String) -> BoxFuture<'_, Result<(), PipelineError>>;

    /// Reset jobs stuck in `processing` longer than `older_than`.
    fn reap_stale(&self, older_than: Duration) -> BoxFuture<'_, Result<u64, PipelineError>>;

    fn dead_letters(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>>;
}
