use {
    crate::domain::{
        error::PipelineError,
        id::OrderNumber,
        money::{Currency, MoneyAmount},
        order::{
            NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentChannel, PaymentStatus,
            ProviderReference, ReferenceKind,
        },
        provider::BoxFuture,
        store::OrderStore,
        webhook::{OrderLookup, WebhookRecord},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_email, customer_name, customer_phone, \
     shipping_address, total, currency, status, payment_status, payment_method, \
     payment_link_id, payment_link_url, payment_request_id, payment_request_url, \
     payment_channel, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_price, quantity, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_email: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    shipping_address: Option<serde_json::Value>,
    total: i64,
    currency: String,
    status: String,
    payment_status: String,
    payment_method: Option<String>,
    payment_link_id: Option<String>,
    payment_link_url: Option<String>,
    payment_request_id: Option<String>,
    payment_request_url: Option<String>,
    payment_channel: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PipelineError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let payment_link = match (row.payment_link_id, row.payment_link_url) {
            (Some(id), url) => Some(ProviderReference::link(id, url.unwrap_or_default())),
            (None, _) => None,
        };
        let payment_request = match (row.payment_request_id, row.payment_channel) {
            (Some(id), Some(channel)) => Some(ProviderReference::request(
                id,
                row.payment_request_url.unwrap_or_default(),
                PaymentChannel::try_from(channel.as_str())?,
            )),
            (Some(id), None) => Some(ProviderReference {
                kind: ReferenceKind::PaymentRequest,
                id,
                url: row.payment_request_url.unwrap_or_default(),
                channel: None,
            }),
            (None, _) => None,
        };
        // Legacy free-form values that fit neither shape are dropped, not fatal.
        let shipping_address = row
            .shipping_address
            .and_then(|v| serde_json::from_value(v).ok());

        Ok(Order {
            id: row.id,
            order_number: OrderNumber::new(row.order_number)?,
            customer_email: row.customer_email,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            shipping_address,
            total: MoneyAmount::new(row.total)?,
            currency: Currency::try_from(row.currency.as_str())?,
            status: OrderStatus::try_from(row.status.as_str())?,
            payment_status: PaymentStatus::try_from(row.payment_status.as_str())?,
            payment_method: row.payment_method,
            payment_link,
            payment_request,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Option<Uuid>,
    product_name: String,
    product_price: i64,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = PipelineError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: MoneyAmount::new(row.product_price)?,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookRow {
    id: Uuid,
    order_id: Uuid,
    provider_event_id: Option<String>,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
}

impl From<WebhookRow> for WebhookRecord {
    fn from(row: WebhookRow) -> Self {
        WebhookRecord {
            id: row.id,
            order_id: row.order_id,
            provider_event_id: row.provider_event_id,
            payload: row.payload,
            received_at: row.received_at,
        }
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_order_inner(&self, order: NewOrder) -> Result<Order, PipelineError> {
        let address = order
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders
                (id, order_number, customer_email, customer_name, customer_phone,
                 shipping_address, total, currency, payment_method, status, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', 'pending')
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(order.order_number.as_str())
        .bind(&order.customer_email)
        .bind(order.customer_name.as_deref())
        .bind(order.customer_phone.as_deref())
        .bind(address)
        .bind(order.total.francs())
        .bind(Currency::Xof.as_str())
        .bind(order.payment_method.as_deref())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn insert_items_inner(
        &self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, PipelineError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        // Single statement, so the batch lands entirely or not at all.
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO order_items (id, order_id, product_id, product_name, product_price, quantity) ",
        );
        qb.push_values(&items, |mut b, item| {
            b.push_bind(item.id)
                .push_bind(order_id)
                .push_bind(item.product_id)
                .push_bind(&item.product_name)
                .push_bind(item.product_price.francs())
                .push_bind(item.quantity);
        });
        qb.push(format!(" RETURNING {ITEM_COLUMNS}"));

        let rows: Vec<ItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn find_pending_inner(&self, lookup: OrderLookup) -> Result<Vec<Order>, PipelineError> {
        let column = match &lookup {
            OrderLookup::PaymentRequestId(_) => "payment_request_id",
            OrderLookup::PaymentLinkId(_) => "payment_link_id",
            OrderLookup::OrderNumber(_) => "order_number",
        };
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE {column} = $1 AND payment_status = 'pending' \
             ORDER BY created_at LIMIT 2"
        ))
        .bind(lookup.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn mark_paid_inner(&self, record: WebhookRecord) -> Result<bool, PipelineError> {
        // Guarded transition and audit append in one statement: a concurrent
        // duplicate delivery finds payment_status already 'paid' and writes nothing.
        let transitioned: Option<Uuid> = sqlx::query_scalar(
            r#"
            WITH paid AS (
                UPDATE orders
                SET payment_status = 'paid', status = 'processing', updated_at = now()
                WHERE id = $1 AND payment_status = 'pending'
                RETURNING id
            )
            INSERT INTO order_webhooks (id, order_id, provider_event_id, payload, received_at)
            SELECT $2, paid.id, $3, $4, $5 FROM paid
            RETURNING order_id
            "#,
        )
        .bind(record.order_id)
        .bind(record.id)
        .bind(record.provider_event_id.as_deref())
        .bind(&record.payload)
        .bind(record.received_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transitioned.is_some())
    }
}

impl OrderStore for PgOrderStore {
    fn insert_order(&self, order: NewOrder) -> BoxFuture<'_, Result<Order, PipelineError>> {
        Box::pin(self.insert_order_inner(order))
    }

    fn insert_items(
        &self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>> {
        Box::pin(self.insert_items_inner(order_id, items))
    }

    fn delete_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM orders WHERE id = $1")
                .bind(order_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn get_order(&self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, PipelineError>> {
        Box::pin(async move {
            sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
            ))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
        })
    }

    fn list_items(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<OrderItem>, PipelineError>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, ItemRow>(&format!(
                "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 \
                 ORDER BY created_at DESC, id DESC"
            ))
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter().map(OrderItem::try_from).collect()
        })
    }

    fn attach_payment_link(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE orders SET payment_link_id = $1, payment_link_url = $2, updated_at = now() \
                 WHERE id = $3",
            )
            .bind(&reference.id)
            .bind(&reference.url)
            .bind(order_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn attach_payment_request(
        &self,
        order_id: Uuid,
        reference: ProviderReference,
    ) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(async move {
            let channel = reference.channel.map(|c| c.as_str());
            let result = sqlx::query(
                r#"
                UPDATE orders
                SET payment_request_id = $1, payment_request_url = $2,
                    payment_channel = $3, payment_method = COALESCE($3, payment_method),
                    updated_at = now()
                WHERE id = $4
                "#,
            )
            .bind(&reference.id)
            .bind(&reference.url)
            .bind(channel)
            .bind(order_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn find_pending(&self, lookup: OrderLookup) -> BoxFuture<'_, Result<Vec<Order>, PipelineError>> {
        Box::pin(self.find_pending_inner(lookup))
    }

    fn mark_paid(&self, record: WebhookRecord) -> BoxFuture<'_, Result<bool, PipelineError>> {
        Box::pin(self.mark_paid_inner(record))
    }

    fn webhook_log(&self, order_id: Uuid) -> BoxFuture<'_, Result<Vec<WebhookRecord>, PipelineError>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, WebhookRow>(
                "SELECT id, order_id, provider_event_id, payload, received_at \
                 FROM order_webhooks WHERE order_id = $1 ORDER BY received_at, id",
            )
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(WebhookRecord::from).collect())
        })
    }
}
