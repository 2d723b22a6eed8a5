use {
    crate::domain::{
        error::PipelineError,
        notification::NewNotificationJob,
        order::Order,
        store::{NotificationQueue, OrderStore},
        webhook::{
            IgnoreReason, JekoEvent, OrderLookup, TransactionStatus, TransactionType,
            WebhookOutcome, WebhookRecord,
        },
    },
};

/// Walk the lookup chain; the first identifier matching exactly one pending
/// order wins. Ambiguous matches fall through to the next identifier.
pub async fn resolve_pending_order(
    store: &dyn OrderStore,
    chain: Vec<OrderLookup>,
) -> Result<Option<Order>, PipelineError> {
    for lookup in chain {
        let mut matches = store.find_pending(lookup.clone()).await?;
        match matches.len() {
            0 => {
                tracing::debug!(by = lookup.label(), value = lookup.value(), "no pending order");
            }
            1 => {
                let order = matches.remove(0);
                tracing::info!(by = lookup.label(), order_id = %order.id, "order resolved");
                return Ok(Some(order));
            }
            n => {
                tracing::warn!(by = lookup.label(), value = lookup.value(), matches = n, "ambiguous lookup, skipping");
            }
        }
    }
    Ok(None)
}

/// Apply a verified, parsed Jeko event.
///
/// The pending → paid write and its audit entry go through
/// [`OrderStore::mark_paid`] as one conditional statement, so concurrent
/// deliveries of the same event transition the order once.
pub async fn process_webhook(
    store: &dyn OrderStore,
    queue: &dyn NotificationQueue,
    admin_phones: &[String],
    event: &JekoEvent,
    payload: serde_json::Value,
) -> Result<WebhookOutcome, PipelineError> {
    if event.transaction_type != TransactionType::Payment {
        return Ok(WebhookOutcome::Ignored(IgnoreReason::NotAPayment));
    }
    if event.status != TransactionStatus::Success {
        return Ok(WebhookOutcome::Ignored(IgnoreReason::NotSuccessful));
    }

    let chain = event.lookup_chain();
    if chain.is_empty() {
        return Ok(WebhookOutcome::MissingReference);
    }

    let Some(order) = resolve_pending_order(store, chain).await? else {
        return Ok(WebhookOutcome::Unresolved);
    };

    let record = WebhookRecord::new(order.id, event, payload);
    if !store.mark_paid(record).await? {
        tracing::info!(order_id = %order.id, "order already paid by a concurrent delivery");
        return Ok(WebhookOutcome::Duplicate(order.id));
    }
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order marked paid");

    for job in NewNotificationJob::for_paid_order(order.id, admin_phones) {
        let audience = job.audience.to_string();
        match queue.enqueue(job).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(order_id = %order.id, %audience, "notification already queued"),
            Err(e) => {
                tracing::error!(order_id = %order.id, %audience, error = %e, "failed to queue notification")
            }
        }
    }

    Ok(WebhookOutcome::Updated(order.id))
}
