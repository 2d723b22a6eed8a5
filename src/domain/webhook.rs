use {
    super::error::PipelineError,
    chrono::{DateTime, Utc},
    hmac::{Hmac, Mac},
    serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned},
    sha2::Sha256,
    subtle::ConstantTimeEq,
    uuid::Uuid,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Jeko-Signature";

/// Check `Jeko-Signature` against HMAC-SHA256(secret, raw body), hex encoded.
///
/// The header may carry a `sha256=` or `hex=` prefix. The MAC is computed over
/// the bytes exactly as received, never over a re-serialized payload.
pub fn verify_signature(secret: &str, raw_body: &[u8], header: &str) -> Result<(), PipelineError> {
    let provided = strip_signature_prefix(header.trim());
    let provided = hex::decode(provided)
        .map_err(|_| PipelineError::WebhookSignature("signature is not hex".into()))?;

    let mut mac = keyed_mac(secret)?;
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    // ct_eq on slices of different length is already false
    if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
        return Err(PipelineError::WebhookSignature("signature mismatch".into()));
    }
    Ok(())
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, PipelineError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PipelineError::WebhookSignature(e.to_string()))
}

fn strip_signature_prefix(sig: &str) -> &str {
    for prefix in ["sha256=", "hex="] {
        if matches!(sig.get(..prefix.len()), Some(head) if head.eq_ignore_ascii_case(prefix)) {
            return sig[prefix.len()..].trim();
        }
    }
    sig
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Transfer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Error,
    Pending,
    #[serde(other)]
    Other,
}

/// Informational only; integer or decimal amounts both parse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventAmount {
    #[serde(default)]
    pub amount: Option<serde_json::Number>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Fields we only log or audit must never reject a delivery: a value of the
/// wrong shape reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub payment_request_id: Option<String>,
}

/// `transaction.completed` notification from Jeko. Only the fields we act on
/// are typed; the full payload is kept separately for the audit log. Only
/// `status`, `transactionType` and `transactionDetails` can reject an event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JekoEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub amount: Option<EventAmount>,
    pub status: TransactionStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub payment_method: Option<String>,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub transaction_details: TransactionDetails,
}

/// One strategy of the order resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    PaymentRequestId(String),
    PaymentLinkId(String),
    OrderNumber(String),
}

impl OrderLookup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PaymentRequestId(_) => "payment_request_id",
            Self::PaymentLinkId(_) => "payment_link_id",
            Self::OrderNumber(_) => "order_number",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::PaymentRequestId(v) | Self::PaymentLinkId(v) | Self::OrderNumber(v) => v,
        }
    }
}

impl JekoEvent {
    /// Identifiers present in the payload, highest priority first:
    /// payment request id, payment link id, then the order number reference.
    pub fn lookup_chain(&self) -> Vec<OrderLookup> {
        let d = &self.transaction_details;
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        [
            present(&d.payment_request_id).map(OrderLookup::PaymentRequestId),
            present(&d.payment_link_id).map(OrderLookup::PaymentLinkId),
            present(&d.reference).map(OrderLookup::OrderNumber),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Entry of an order's append-only webhook audit log.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl WebhookRecord {
    pub fn new(order_id: Uuid, event: &JekoEvent, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            provider_event_id: event.id.clone(),
            payload,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAPayment,
    NotSuccessful,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Order moved pending → paid.
    Updated(Uuid),
    /// Event is not something we apply (transfer, failed attempt).
    Ignored(IgnoreReason),
    /// Payload carries none of the lookup identifiers.
    MissingReference,
    /// No pending order matched any identifier. Re-deliveries for paid
    /// orders land here.
    Unresolved,
    /// Resolved, but a concurrent delivery won the transition.
    Duplicate(Uuid),
}
