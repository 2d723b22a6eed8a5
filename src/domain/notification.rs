use {
    super::error::PipelineError,
    super::order::{Order, OrderItem},
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::{collections::BTreeMap, fmt},
    uuid::Uuid,
};

const NOT_SPECIFIED: &str = "Non spécifié";
const NOT_SPECIFIED_F: &str = "Non spécifiée";
const CUSTOMER_COUNTRY_CODE: &str = "225";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "audience", rename_all = "snake_case")]
pub enum Audience {
    Customer,
    Admin { phone: String },
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin { .. } => "admin",
        }
    }

    /// Stored recipient column; empty for the customer, whose phone comes
    /// from the order at send time.
    pub fn recipient(&self) -> &str {
        match self {
            Self::Customer => "",
            Self::Admin { phone } => phone,
        }
    }

    pub fn from_parts(audience: &str, recipient: &str) -> Result<Self, PipelineError> {
        match audience {
            "customer" => Ok(Self::Customer),
            "admin" if !recipient.is_empty() => Ok(Self::Admin {
                phone: recipient.to_string(),
            }),
            other => Err(PipelineError::Validation(format!(
                "unknown notification audience: {other} ({recipient})"
            ))),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin { phone } => write!(f, "admin:{phone}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotificationJob {
    pub id: Uuid,
    pub order_id: Uuid,
    pub audience: Audience,
}

impl NewNotificationJob {
    /// One job per recipient so each delivery retries on its own.
    pub fn for_paid_order(order_id: Uuid, admin_phones: &[String]) -> Vec<Self> {
        std::iter::once(Audience::Customer)
            .chain(admin_phones.iter().map(|phone| Audience::Admin {
                phone: phone.clone(),
            }))
            .map(|audience| Self {
                id: Uuid::now_v7(),
                order_id,
                audience,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(PipelineError::Validation(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub id: Uuid,
    pub order_id: Uuid,
    pub audience: Audience,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Template {
        content_sid: String,
        variables: BTreeMap<String, String>,
    },
    Freeform {
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// `whatsapp:+<E.164>`
    pub to: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceipt {
    pub sid: String,
    pub status: String,
}

/// Customer number as typed at checkout → WhatsApp address. Local numbers
/// get the Côte d'Ivoire country code.
pub fn customer_whatsapp_address(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with(CUSTOMER_COUNTRY_CODE) {
        Some(format!("whatsapp:+{digits}"))
    } else {
        Some(format!("whatsapp:+{CUSTOMER_COUNTRY_CODE}{digits}"))
    }
}

/// Admin numbers are configured in international form, `+` optional.
pub fn admin_whatsapp_address(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        format!("whatsapp:{phone}")
    } else {
        format!("whatsapp:+{phone}")
    }
}

pub fn customer_template_variables(order: &Order) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("1".to_string(), format!("#{}", order.order_number)),
        ("2".to_string(), order.total.display_xof()),
    ])
}

pub fn admin_template_variables(order: &Order) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("1".to_string(), order.order_number.to_string()),
        ("2".to_string(), or_unspecified(order.customer_name.as_deref(), NOT_SPECIFIED)),
        ("3".to_string(), or_unspecified(order.customer_phone.as_deref(), NOT_SPECIFIED)),
        ("4".to_string(), order.total.display_xof()),
        ("5".to_string(), or_unspecified(order.payment_method.as_deref(), NOT_SPECIFIED_F)),
    ])
}

pub fn customer_confirmation_body(order: &Order) -> String {
    format!(
        "✅ Paiement confirmé!\n\n\
         Votre commande #{number} a été payée avec succès.\n\n\
         Montant: {amount}\n\n\
         Nous traiterons votre commande sous peu et vous contacterons pour la livraison.\n\n\
         Merci pour votre achat! 🎉",
        number = order.order_number,
        amount = order.total.display_xof(),
    )
}

pub fn admin_alert_body(order: &Order, items: &[OrderItem]) -> String {
    let items_summary = items
        .iter()
        .map(|item| {
            let subtotal = item
                .subtotal()
                .map(|s| s.display_xof())
                .unwrap_or_else(|| "?".into());
            format!("• {} x{} - {}", item.product_name, item.quantity, subtotal)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let address = order
        .shipping_address
        .as_ref()
        .and_then(|a| a.summary())
        .unwrap_or_else(|| NOT_SPECIFIED_F.to_string());

    format!(
        "🛒 NOUVELLE VENTE\n\n\
         Commande: #{number}\n\
         Date: {date}\n\n\
         👤 CLIENT\n\
         Nom: {name}\n\
         Téléphone: {phone}\n\
         Adresse: {address}\n\n\
         📦 ARTICLES\n\
         {items_summary}\n\n\
         💰 TOTAL: {total}\n\n\
         💳 Méthode: {method}",
        number = order.order_number,
        date = order.created_at.format("%d/%m/%Y %H:%M:%S"),
        name = or_unspecified(order.customer_name.as_deref(), NOT_SPECIFIED),
        phone = or_unspecified(order.customer_phone.as_deref(), NOT_SPECIFIED),
        total = order.total.display_xof(),
        method = or_unspecified(order.payment_method.as_deref(), NOT_SPECIFIED_F),
    )
}

fn or_unspecified(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
