//! Process-local stores with the same semantics as the Postgres ones, so
//! service tests run without a database.

use {
    order_sync::domain::{
        error::PipelineError,
        notification::{JobStatus, NewNotificationJob, NotificationJob},
        order::{
            NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentStatus,
            ProviderReference,
        },
        money::Currency,
        provider::BoxFuture,
        store::{NotificationQueue, OrderStore},
        webhook::{OrderLookup, WebhookRecord},
    },
    chrono::{DateTime, Duration, Utc},
    std::sync::{Mutex, MutexGuard},
    uuid::Uuid,
};

pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

#[derive(Default)]
struct Tables {
    // Insertion order doubles as creation order.
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    webhooks: Vec<WebhookRecord>,
}

#[derive(Default)]
pub struct MemoryOrderStore {
    tables: Mutex<Tables>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every order in creation order.
    pub fn orders(&self) -> Result<Vec<Order>, PipelineError> {
        Ok(self.lock()?.orders.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, PipelineError> {
        self.tables
            .lock()
            .map_err(|_| PipelineError::Store("order store lock poisoned".into()))
    }

    fn update<F>(&self, order_id: Uuid, apply: F) -> Result<bool, PipelineError>
    where
        F: FnOnce(&mut Order),
    {
        let mut tables = self.lock()?;
        match tables.orders.iter_mut().find(|o| o.id == order_id) {
            Some(order) => {
                apply(order);
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn matches_lookup(order: &Order, lookup: &OrderLookup) -> bool {
    match lookup {
        OrderLookup::PaymentRequestId(id) => {
            order.payment_request.as_ref().is_some_and(|r| &r.id == id)
        }
        OrderLookup::PaymentLinkId(id) => order.payment_link.as_ref().is_some_and(|r| &r.id == id),
        OrderLookup::OrderNumber(number) => order.order_number.as_str() == number,
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert_order(&self, order: NewOrder) -> BoxFuture<'_, Result<Order, PipelineError>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if tables
                .orders
                .iter()
                .any(|o| o.id == order.id || o.order_number == order.order_number)
            {
                return Err(PipelineError::Store(format!(
                    "duplicate order: {}",
                    order.order_number
                )));
            }
            let now = Utc::now();
            let created = Order {
                id: order.id,
                order_number: order.order_number,
                customer_email: order.customer_email,
                customer_name: order.customer_name,
                customer_phone: order.customer_phone,
                shipping_address: order.shipping_address,
                total: order.total,
                currency: Currency::Xof,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                payment_method: order.payment_method,
                payment_link: None,
                payment_request: None,
                created_at: now,
                updated_at: now,
            };
            tables.orders.push(created.clone());
            Ok(created)
        })
    }

    fn insert_items(
        &self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            if !tables.orders.iter().any(|o| o.id == order_id) {
                return Err(PipelineError::Store(format!(
                    "order {order_id} does not exist"
                )));
            }
            let now = Utc::now();
            let inserted: Vec<OrderItem> = items
                .into_iter()
                .map(|item| OrderItem {
                    id: item.id,
                    order_id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    product_price: item.product_price,
                    quantity: item.quantity,
                    created_at: now,
                })
                .collect();
            tables.items.extend(inserted.iter().cloned());
            Ok(inserted)
        })
    }

    fn delete_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            let mut tables = self.lock()?;
            let before = tables.orders.len();
            tables.orders.retain(|o| o.id != order_id);
            tables.items.retain(|i| i.order_id != order_id);
            tables.webhooks.retain(|w| w.order_id != order_id);
            Ok(tables.orders.len() < before)
        })
    }

    fn get_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, PipelineError>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables.orders.iter().find(|o| o.id == order_id).cloned())
        })
    }

    fn list_items(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .items
                .iter()
                .rev()
                .filter(|i| i.order_id == order_id)
                .cloned()
                .collect())
        })
    }

    fn attach_payment_link(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move { self.update(order_id, |order| order.payment_link = Some(reference)) })
    }

    fn attach_payment_request(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            self.update(order_id, |order| {
                if let Some(channel) = reference.channel {
                    order.payment_method = Some(channel.as_str().to_string());
                }
                order.payment_request = Some(reference);
            })
        })
    }

    fn find_pending(&self, lookup: OrderLookup) -> BoxFuture<'_, Result<Vec<Order>, PipelineError>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .orders
                .iter()
                .filter(|o| o.payment_status == PaymentStatus::Pending)
                .filter(|o| matches_lookup(o, &lookup))
                .take(2)
                .cloned()
                .collect())
        })
    }

    fn mark_paid(&self, record: WebhookRecord) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            // One lock covers the check, the transition and the audit append.
            let mut tables = self.lock()?;
            let Some(order) = tables
                .orders
                .iter_mut()
                .find(|o| o.id == record.order_id)
            else {
                return Ok(false);
            };
            if !order.payment_status.can_transition_to(&PaymentStatus::Paid) {
                return Ok(false);
            }
            order.payment_status = PaymentStatus::Paid;
            order.status = OrderStatus::Processing;
            order.updated_at = Utc::now();
            tables.webhooks.push(record);
            Ok(true)
        })
    }

    fn webhook_log(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<WebhookRecord>, PipelineError>> {
        Box::pin(async move {
            let tables = self.lock()?;
            Ok(tables
                .webhooks
                .iter()
                .filter(|w| w.order_id == order_id)
                .cloned()
                .collect())
        })
    }
}

struct JobEntry {
    job: NotificationJob,
    updated_at: DateTime<Utc>,
}

pub struct MemoryNotificationQueue {
    jobs: Mutex<Vec<JobEntry>>,
    base_delay: Duration,
    max_attempts: i32,
}

impl Default for MemoryNotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNotificationQueue {
    /// Backoff of 2^attempts seconds, five attempts, like the Postgres queue.
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            base_delay: Duration::seconds(1),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Scale the backoff; `Duration::zero()` makes failed jobs due immediately.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Every job in enqueue order.
    pub fn snapshot(&self) -> Result<Vec<NotificationJob>, PipelineError> {
        Ok(self.lock()?.iter().map(|e| e.job.clone()).collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<JobEntry>>, PipelineError> {
        self.jobs
            .lock()
            .map_err(|_| PipelineError::Store("notification queue lock poisoned".into()))
    }

    fn backoff(&self, attempts: i32) -> Duration {
        self.base_delay * 2_i32.saturating_pow(attempts.clamp(0, 20) as u32)
    }
}

impl NotificationQueue for MemoryNotificationQueue {
    fn enqueue(&self, job: NewNotificationJob) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            let mut jobs = self.lock()?;
            if jobs
                .iter()
                .any(|e| e.job.order_id == job.order_id && e.job.audience == job.audience)
            {
                return Ok(false);
            }
            let now = Utc::now();
            jobs.push(JobEntry {
                job: NotificationJob {
                    id: job.id,
                    order_id: job.order_id,
                    audience: job.audience,
                    status: JobStatus::Pending,
                    attempts: 0,
                    max_attempts: self.max_attempts,
                    last_error: None,
                    scheduled_at: now,
                },
                updated_at: now,
            });
            Ok(true)
        })
    }

    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>> {
        Box::pin(async move {
            let mut jobs = self.lock()?;
            let now = Utc::now();
            let mut due: Vec<&mut JobEntry> = jobs
                .iter_mut()
                .filter(|e| e.job.status == JobStatus::Pending && e.job.scheduled_at <= now)
                .collect();
            due.sort_by_key(|e| e.job.scheduled_at);

            Ok(due
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|entry| {
                    entry.job.status = JobStatus::Processing;
                    entry.updated_at = now;
                    entry.job.clone()
                })
                .collect())
        })
    }

    fn complete(&self, job_id: Uuid) -> BoxFuture<'_, Result<(), PipelineError>> {
        Box::pin(async move {
            let mut jobs = self.lock()?;
            if let Some(entry) = jobs.iter_mut().find(|e| e.job.id == job_id) {
                entry.job.status = JobStatus::Completed;
                entry.updated_at = Utc::now();
            }
            Ok(())
        })
    }

    fn fail(&self, job_id: Uuid, error: String) -> BoxFuture<'_, Result<(), PipelineError>> {
        Box::pin(async move {
            let mut jobs = self.lock()?;
            let now = Utc::now();
            let Some(entry) = jobs.iter_mut().find(|e| e.job.id == job_id) else {
                return Ok(());
            };
            let attempts = entry.job.attempts + 1;
            entry.job.attempts = attempts;
            entry.job.last_error = Some(error);
            entry.updated_at = now;
            if attempts >= entry.job.max_attempts {
                entry.job.status = JobStatus::Failed;
            } else {
                entry.job.status = JobStatus::Pending;
                entry.job.scheduled_at = now + self.backoff(attempts);
            }
            Ok(())
        })
    }

    fn reap_stale(&self, older_than: Duration) -> BoxFuture<'_, Result<u64, PipelineError>> {
        Box::pin(async move {
            let mut jobs = self.lock()?;
            let now = Utc::now();
            let cutoff = now - older_than;
            let mut reaped = 0;
            for entry in jobs
                .iter_mut()
                .filter(|e| e.job.status == JobStatus::Processing && e.updated_at < cutoff)
            {
                entry.job.status = JobStatus::Pending;
                entry.updated_at = now;
                reaped += 1;
            }
            Ok(reaped)
        })
    }

    fn dead_letters(&self, limit: i64) -> BoxFuture<'_, Result<Vec<NotificationJob>, PipelineError>> {
        Box::pin(async move {
            let jobs = self.lock()?;
            let mut failed: Vec<&JobEntry> = jobs
                .iter()
                .filter(|e| e.job.status == JobStatus::Failed)
                .collect();
            failed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(failed
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .map(|e| e.job.clone())
                .collect())
        })
    }
}
