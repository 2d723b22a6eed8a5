use {
    crate::{
        AppState,
        config::JekoCredentials,
        domain::{
            error::PipelineError,
            provider::{
                BoxFuture, PaymentGateway, PaymentLink, PaymentLinkRequest, PaymentRequestCreated,
                RedirectPaymentRequest,
            },
            webhook::{IgnoreReason, JekoEvent, SIGNATURE_HEADER, WebhookOutcome, verify_signature},
        },
        services::webhook_receiver::process_webhook,
    },
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::HeaderMap,
    },
    serde::{Serialize, de::DeserializeOwned},
    std::time::Duration,
    uuid::Uuid,
};

const PAYMENT_LINKS_PATH: &str = "/partner_api/payment_links";
const PAYMENT_REQUESTS_PATH: &str = "/partner_api/payment_requests";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Jeko partner API over HTTPS, authenticated with the API key pair.
pub struct JekoClient {
    http: reqwest::Client,
    credentials: JekoCredentials,
}

impl JekoClient {
    pub fn new(credentials: JekoCredentials) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("http client: {e}")))?;
        Ok(Self { http, credentials })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
        failure: &str,
    ) -> Result<T, PipelineError> {
        let url = format!("{}{path}", self.credentials.base_url.trim_end_matches('/'));
        let gateway_error = |details: serde_json::Value| PipelineError::Gateway {
            message: failure.to_string(),
            details,
        };

        let response = self
            .http
            .post(&url)
            .header("X-API-KEY", &*self.credentials.api_key)
            .header("X-API-KEY-ID", &*self.credentials.api_key_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| gateway_error(serde_json::Value::String(e.to_string())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| gateway_error(serde_json::Value::String(e.to_string())))?;

        if !status.is_success() {
            let details = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            tracing::error!(%status, %details, "Jeko API error");
            return Err(gateway_error(details));
        }

        serde_json::from_str(&text).map_err(|e| {
            gateway_error(serde_json::json!({
                "parse_error": e.to_string(),
                "body": text,
            }))
        })
    }

    async fn create_link_inner(&self, request: PaymentLinkRequest) -> Result<PaymentLink, PipelineError> {
        let body = serde_json::json!({
            "storeId": &*self.credentials.store_id,
            "title": request.title,
            "amountCents": request.amount_cents,
            "currency": "XOF",
            "allowMultiplePayments": false,
        });
        self.post_json(PAYMENT_LINKS_PATH, body, "Failed to create payment link")
            .await
    }

    async fn create_request_inner(
        &self,
        request: RedirectPaymentRequest,
    ) -> Result<PaymentRequestCreated, PipelineError> {
        let body = serde_json::json!({
            "storeId": &*self.credentials.store_id,
            "amountCents": request.amount_cents,
            "currency": "XOF",
            "reference": request.reference,
            "paymentDetails": {
                "type": "redirect",
                "data": {
                    "paymentMethod": request.channel.as_str(),
                    "successUrl": request.success_url,
                    "errorUrl": request.error_url,
                },
            },
        });
        self.post_json(PAYMENT_REQUESTS_PATH, body, "Failed to create payment request")
            .await
    }
}

impl PaymentGateway for JekoClient {
    fn create_payment_link(
        &self,
        request: PaymentLinkRequest,
    ) -> BoxFuture<'_, Result<PaymentLink, PipelineError>> {
        Box::pin(self.create_link_inner(request))
    }

    fn create_payment_request(
        &self,
        request: RedirectPaymentRequest,
    ) -> BoxFuture<'_, Result<PaymentRequestCreated, PipelineError>> {
        Box::pin(self.create_request_inner(request))
    }
}

/// Body of every webhook response. Jeko retries anything but a 200, so
/// problems are reported in the body instead of the status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    fn message(message: impl Into<String>) -> Self {
        Self {
            received: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn error(error: impl std::fmt::Display) -> Self {
        Self {
            received: true,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    fn from_outcome(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Updated(order_id) => Self {
                received: true,
                order_id: Some(order_id),
                status: Some("updated"),
                ..Self::default()
            },
            WebhookOutcome::Duplicate(order_id) => Self {
                received: true,
                order_id: Some(order_id),
                status: Some("duplicate"),
                message: Some("Order already paid".into()),
                ..Self::default()
            },
            WebhookOutcome::Ignored(IgnoreReason::NotAPayment) => {
                Self::message("Non-payment transaction ignored")
            }
            WebhookOutcome::Ignored(IgnoreReason::NotSuccessful) => {
                Self::message("Transaction not successful")
            }
            WebhookOutcome::MissingReference => {
                Self::message("Missing payment reference in transactionDetails")
            }
            WebhookOutcome::Unresolved => Self::message("Order not found"),
        }
    }
}

/// Verify, parse and apply one delivery. Never fails: every path yields an ack.
pub async fn receive_jeko_webhook(
    state: &AppState,
    signature: Option<&str>,
    body: &[u8],
) -> WebhookAck {
    match &state.webhook_secret {
        Some(secret) => {
            let Some(signature) = signature else {
                tracing::warn!("webhook without signature header rejected");
                return WebhookAck::message("Missing signature header");
            };
            if let Err(e) = verify_signature(secret, body, signature) {
                tracing::warn!(error = %e, "webhook signature rejected");
                return WebhookAck::message("Invalid signature");
            }
        }
        None => tracing::warn!("JEKO_WEBHOOK_SECRET not configured, skipping signature verification"),
    }

    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body is not JSON");
            return WebhookAck::error(PipelineError::from(e));
        }
    };
    let event: JekoEvent = match serde_json::from_value(payload.clone()) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body is not a Jeko event");
            return WebhookAck::error(PipelineError::from(e));
        }
    };
    if let Some(id) = &event.id {
        tracing::Span::current().record("event_id", tracing::field::display(id));
    }

    match process_webhook(
        &*state.store,
        &*state.queue,
        &state.admin_phones,
        &event,
        payload,
    )
    .await
    {
        Ok(outcome) => {
            tracing::info!(?outcome, "webhook processed");
            WebhookAck::from_outcome(outcome)
        }
        Err(e) => {
            tracing::error!(error = %e, "webhook processing failed");
            WebhookAck::error(e)
        }
    }
}

#[tracing::instrument(name = "webhook", skip_all, fields(event_id = tracing::field::Empty))]
pub async fn jeko_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    Json(receive_jeko_webhook(&state, signature, &body).await)
}
