use {
    super::error::{NotificationError, PipelineError},
    super::notification::{MessageReceipt, OutboundMessage},
    super::order::PaymentChannel,
    serde::{Deserialize, Serialize},
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Single-use hosted checkout link for a fixed amount.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentLinkRequest {
    pub title: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub link: String,
    pub id: String,
}

/// Redirect-flow payment on a specific mobile-money channel.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectPaymentRequest {
    pub amount_cents: i64,
    pub reference: String,
    pub channel: PaymentChannel,
    pub success_url: String,
    pub error_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestCreated {
    pub id: String,
    pub redirect_url: String,
}

pub trait PaymentGateway: Send + Sync {
    fn create_payment_link(
        &self,
        request: PaymentLinkRequest,
    ) -> BoxFuture<'_, Result<PaymentLink, PipelineError>>;

    fn create_payment_request(
        &self,
        request: RedirectPaymentRequest,
    ) -> BoxFuture<'_, Result<PaymentRequestCreated, PipelineError>>;
}

pub trait Messenger: Send + Sync {
    fn send(
        &self,
        message: OutboundMessage,
    ) -> BoxFuture<'_, Result<MessageReceipt, NotificationError>>;
}
