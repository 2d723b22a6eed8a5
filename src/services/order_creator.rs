use {
    crate::domain::{
        error::PipelineError,
        id::OrderNumber,
        order::{CreateOrderRequest, NewOrder, Order, PricedCart},
        store::OrderStore,
    },
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub order_number: OrderNumber,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate the cart, persist the order and its items.
///
/// Items are inserted after the order row. If that fails the order is deleted
/// again (once, best effort) and the item error is returned.
#[tracing::instrument(name = "create_order", skip_all, fields(order_number))]
pub async fn create_order(
    store: &dyn OrderStore,
    request: CreateOrderRequest,
) -> Result<CreatedOrder, PipelineError> {
    let customer_email = non_blank(request.customer_email).ok_or_else(|| {
        PipelineError::Validation(
            "Missing required fields: customer_email and items are required".into(),
        )
    })?;
    let cart = PricedCart::from_lines(&request.items)?;

    let order_number = OrderNumber::generate();
    tracing::Span::current().record("order_number", order_number.as_str());

    let order = store
        .insert_order(NewOrder {
            id: Uuid::now_v7(),
            order_number: order_number.clone(),
            customer_email,
            customer_name: non_blank(request.customer_name),
            customer_phone: non_blank(request.customer_phone),
            shipping_address: request.shipping_address,
            total: cart.total,
            payment_method: non_blank(request.payment_method),
        })
        .await?;

    if let Err(e) = store.insert_items(order.id, cart.items).await {
        tracing::error!(order_id = %order.id, error = %e, "item insert failed, rolling back order");
        match store.delete_order(order.id).await {
            Ok(_) => {}
            Err(cleanup) => {
                tracing::error!(order_id = %order.id, error = %cleanup, "compensating delete failed");
            }
        }
        return Err(e);
    }

    tracing::info!(order_id = %order.id, total = %order.total, "order created");
    Ok(CreatedOrder {
        order,
        order_number,
    })
}
