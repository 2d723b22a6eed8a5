use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, jeko::jeko_webhook_handler},
        domain::{
            error::PipelineError,
            order::{CreateOrderRequest, Order, OrderItem},
            provider::{PaymentLink, PaymentRequestCreated},
        },
        services::{
            order_creator::{CreatedOrder, create_order},
            payment_issuer::{create_payment_link, create_payment_request},
        },
    },
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
        http::StatusCode,
        routing::{get, post},
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::timeout::TimeoutLayer,
    uuid::Uuid,
};

// Jeko events and carts are a few KB.
const BODY_LIMIT: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/orders", post(create_order_handler))
        .route("/api/orders/{id}", get(get_order_handler))
        .route("/api/payments/jeko/create-link", post(create_link_handler))
        .route("/api/payments/jeko/create-request", post(create_request_handler))
        .route("/api/webhooks/jeko", post(jeko_webhook_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                ))
                .layer(DefaultBodyLimit::max(BODY_LIMIT)),
        )
        .with_state(state)
}

async fn create_order_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreatedOrder>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(create_order(&*state.store, request).await?))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: OrderDetail,
}

async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| PipelineError::NotFound("Order not found".into()))?;
    let order_items = state.store.list_items(order_id).await?;
    Ok(Json(OrderResponse {
        order: OrderDetail { order, order_items },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkBody {
    #[serde(default)]
    order_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub payment_link: PaymentLink,
}

async fn create_link_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateLinkBody>, JsonRejection>,
) -> Result<Json<PaymentLinkResponse>, ApiError> {
    let Json(body) = payload?;
    let order_id = body
        .order_id
        .ok_or_else(|| PipelineError::Validation("Missing required field: orderId".into()))?;

    let payment_link =
        create_payment_link(&*state.store, state.gateway.as_deref(), order_id).await?;
    Ok(Json(PaymentLinkResponse { payment_link }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequestBody {
    #[serde(default)]
    order_id: Option<Uuid>,
    #[serde(default)]
    payment_method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestResponse {
    pub payment_request: PaymentRequestCreated,
}

async fn create_request_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<Json<PaymentRequestResponse>, ApiError> {
    let Json(body) = payload?;
    let (Some(order_id), Some(method)) = (body.order_id, body.payment_method) else {
        return Err(PipelineError::Validation(
            "Missing required fields: orderId and paymentMethod".into(),
        )
        .into());
    };

    let payment_request = create_payment_request(
        &*state.store,
        state.gateway.as_deref(),
        state.public_base_url.as_deref(),
        order_id,
        &method,
    )
    .await?;
    Ok(Json(PaymentRequestResponse { payment_request }))
}
