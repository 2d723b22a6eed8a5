use {
    super::error::PipelineError,
    super::id::OrderNumber,
    super::money::{Currency, MoneyAmount},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Fulfilment lifecycle, driven by the back office after payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PipelineError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// The only edge is pending → paid; there is no way back.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        matches!((self, next), (Self::Pending, Self::Paid))
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(PipelineError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Mobile-money / wallet channels accepted for redirect payment requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    Wave,
    Orange,
    Mtn,
    Moov,
    Djamo,
}

impl PaymentChannel {
    pub const ALL: [PaymentChannel; 5] = [
        Self::Wave,
        Self::Orange,
        Self::Mtn,
        Self::Moov,
        Self::Djamo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::Orange => "orange",
            Self::Mtn => "mtn",
            Self::Moov => "moov",
            Self::Djamo => "djamo",
        }
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentChannel {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PipelineError::Validation(format!("invalid payment method: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    PaymentLink,
    PaymentRequest,
}

/// Identifier the gateway assigned to an order's checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderReference {
    pub kind: ReferenceKind,
    pub id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<PaymentChannel>,
}

impl ProviderReference {
    pub fn link(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::PaymentLink,
            id: id.into(),
            url: url.into(),
            channel: None,
        }
    }

    pub fn request(id: impl Into<String>, url: impl Into<String>, channel: PaymentChannel) -> Self {
        Self {
            kind: ReferenceKind::PaymentRequest,
            id: id.into(),
            url: url.into(),
            channel: Some(channel),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ShippingAddress {
    Text(String),
    Structured(StructuredAddress),
}

impl ShippingAddress {
    /// One-line rendering used in admin alerts.
    pub fn summary(&self) -> Option<String> {
        let line = match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Structured(addr) => [addr.street.as_deref(), addr.city.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        };
        (!line.is_empty()).then_some(line)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: OrderNumber,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub total: MoneyAmount,
    pub currency: Currency,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub payment_link: Option<ProviderReference>,
    pub payment_request: Option<ProviderReference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_price: MoneyAmount,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn subtotal(&self) -> Option<MoneyAmount> {
        self.product_price.checked_mul(self.quantity)
    }
}

/// Cart line as posted by the storefront; prices are already resolved there.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Insert form of an order; callers mint the id with `Uuid::now_v7()`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: OrderNumber,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub total: MoneyAmount,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_price: MoneyAmount,
    pub quantity: i32,
}

/// Validated cart: line items plus their total.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub items: Vec<NewOrderItem>,
    pub total: MoneyAmount,
}

impl PricedCart {
    pub fn from_lines(lines: &[CartLine]) -> Result<Self, PipelineError> {
        if lines.is_empty() {
            return Err(PipelineError::Validation(
                "Missing required fields: customer_email and items are required".into(),
            ));
        }

        let mut total = MoneyAmount::ZERO;
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let name = line.product_name.trim();
            if name.is_empty() {
                return Err(PipelineError::Validation("item product_name is empty".into()));
            }
            if line.quantity < 1 {
                return Err(PipelineError::Validation(format!(
                    "quantity for {name} must be at least 1, got: {}",
                    line.quantity
                )));
            }
            let price = MoneyAmount::new(line.product_price)?;
            total = price
                .checked_mul(line.quantity)
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| PipelineError::Validation("order total overflows".into()))?;

            items.push(NewOrderItem {
                id: Uuid::now_v7(),
                product_id: line.product_id,
                product_name: name.to_string(),
                product_price: price,
                quantity: line.quantity,
            });
        }

        Ok(Self { items, total })
    }
}
