use {
    crate::domain::{
        error::PipelineError,
        id::OrderNumber,
        order::{Order, OrderItem, PaymentChannel, ProviderReference},
        provider::{
            PaymentGateway, PaymentLink, PaymentLinkRequest, PaymentRequestCreated,
            RedirectPaymentRequest,
        },
        store::OrderStore,
    },
    uuid::Uuid,
};

/// Gateway limit on checkout titles, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// `"Robot (2) x Puzzle (1) - Commande #ORD-…"`, cut to [`MAX_TITLE_LEN`].
/// When cut, the product part ends with `...` and the order suffix survives.
pub fn build_payment_title(items: &[OrderItem], order_number: &OrderNumber) -> String {
    let products = items
        .iter()
        .map(|item| format!("{} ({})", item.product_name, item.quantity))
        .collect::<Vec<_>>()
        .join(" x ");
    let suffix = format!(" - Commande #{order_number}");

    let title_len = products.chars().count() + suffix.chars().count();
    if title_len <= MAX_TITLE_LEN {
        return format!("{products}{suffix}");
    }

    let keep = MAX_TITLE_LEN
        .saturating_sub(suffix.chars().count())
        .saturating_sub(3);
    let truncated: String = products.chars().take(keep).collect();
    format!("{truncated}...{suffix}")
}

fn require_gateway(
    gateway: Option<&dyn PaymentGateway>,
) -> Result<&dyn PaymentGateway, PipelineError> {
    gateway.ok_or_else(|| PipelineError::Configuration("Jeko API credentials not configured".into()))
}

async fn load_order(store: &dyn OrderStore, order_id: Uuid) -> Result<Order, PipelineError> {
    store
        .get_order(order_id)
        .await?
        .ok_or_else(|| PipelineError::NotFound("Order not found".into()))
}

/// Hosted single-use link for the order total. An order that already has a
/// link gets it back without a gateway call.
#[tracing::instrument(name = "create_payment_link", skip(store, gateway))]
pub async fn create_payment_link(
    store: &dyn OrderStore,
    gateway: Option<&dyn PaymentGateway>,
    order_id: Uuid,
) -> Result<PaymentLink, PipelineError> {
    let gateway = require_gateway(gateway)?;
    let order = load_order(store, order_id).await?;

    if let Some(existing) = &order.payment_link {
        tracing::info!(link_id = %existing.id, "reusing existing payment link");
        return Ok(PaymentLink {
            link: existing.url.clone(),
            id: existing.id.clone(),
        });
    }

    let items = store.list_items(order_id).await?;
    let request = PaymentLinkRequest {
        title: build_payment_title(&items, &order.order_number),
        amount_cents: order.total.minor_units()?,
    };

    let link = gateway.create_payment_link(request).await?;

    let reference = ProviderReference::link(link.id.clone(), link.link.clone());
    match store.attach_payment_link(order_id, reference).await {
        Ok(true) => tracing::info!(link_id = %link.id, "payment link recorded"),
        Ok(false) => tracing::warn!(link_id = %link.id, "order vanished before link was recorded"),
        // The link exists at the gateway either way; the caller still gets it.
        Err(e) => tracing::error!(link_id = %link.id, error = %e, "failed to record payment link"),
    }

    Ok(link)
}

/// `<base>/checkout/{success,error}?reference=<num>&order=<id>`
pub fn redirect_urls(base_url: &str, order: &Order) -> (String, String) {
    let base = base_url.trim_end_matches('/');
    let query = format!("reference={}&order={}", order.order_number, order.id);
    (
        format!("{base}/checkout/success?{query}"),
        format!("{base}/checkout/error?{query}"),
    )
}

/// Redirect-flow payment on one mobile-money channel.
#[tracing::instrument(name = "create_payment_request", skip(store, gateway, base_url))]
pub async fn create_payment_request(
    store: &dyn OrderStore,
    gateway: Option<&dyn PaymentGateway>,
    base_url: Option<&str>,
    order_id: Uuid,
    channel: &str,
) -> Result<PaymentRequestCreated, PipelineError> {
    let gateway = require_gateway(gateway)?;
    let channel = PaymentChannel::try_from(channel.trim())?;
    let base_url = base_url
        .ok_or_else(|| PipelineError::Configuration("PUBLIC_BASE_URL not configured".into()))?;
    let order = load_order(store, order_id).await?;

    let (success_url, error_url) = redirect_urls(base_url, &order);
    let created = gateway
        .create_payment_request(RedirectPaymentRequest {
            amount_cents: order.total.minor_units()?,
            reference: order.order_number.to_string(),
            channel,
            success_url,
            error_url,
        })
        .await?;

    let reference = ProviderReference::request(created.id.clone(), created.redirect_url.clone(), channel);
    match store.attach_payment_request(order_id, reference).await {
        Ok(true) => tracing::info!(request_id = %created.id, %channel, "payment request recorded"),
        Ok(false) => {
            tracing::warn!(request_id = %created.id, "order vanished before request was recorded")
        }
        Err(e) => {
            tracing::error!(request_id = %created.id, error = %e, "failed to record payment request")
        }
    }

    Ok(created)
}
