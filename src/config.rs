use {
    crate::domain::error::PipelineError,
    std::{env, sync::Arc},
};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_JEKO_API_BASE_URL: &str = "https://api.jeko.africa";
pub const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

#[derive(Clone)]
pub struct JekoCredentials {
    pub api_key: Arc<str>,
    pub api_key_id: Arc<str>,
    pub store_id: Arc<str>,
    pub base_url: Arc<str>,
}

#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: Arc<str>,
    pub auth_token: Arc<str>,
    /// Sender, e.g. `whatsapp:+14155238886`.
    pub from: Arc<str>,
    pub base_url: Arc<str>,
}

/// Content SIDs of pre-approved WhatsApp templates.
#[derive(Clone, Default)]
pub struct MessageTemplates {
    pub customer_confirmation: Option<Arc<str>>,
    pub admin_notification: Option<Arc<str>>,
}

/// Everything read from the environment, once, at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub public_base_url: Option<Arc<str>>,
    pub jeko: Option<JekoCredentials>,
    pub jeko_webhook_secret: Option<Arc<str>>,
    pub twilio: Option<TwilioCredentials>,
    pub templates: MessageTemplates,
    pub admin_phones: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_arc = |key: &str| get(key).map(Arc::<str>::from);

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| PipelineError::Configuration("DATABASE_URL must be set".into()))?;

        let jeko = match (get_arc("JEKO_API_KEY"), get_arc("JEKO_API_KEY_ID"), get_arc("JEKO_STORE_ID")) {
            (Some(api_key), Some(api_key_id), Some(store_id)) => Some(JekoCredentials {
                api_key,
                api_key_id,
                store_id,
                base_url: get_arc("JEKO_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_JEKO_API_BASE_URL.into()),
            }),
            (None, None, None) => None,
            _ => {
                tracing::warn!("Jeko credentials partially configured, payment issuing disabled");
                None
            }
        };

        let twilio = match (
            get_arc("TWILIO_ACCOUNT_SID"),
            get_arc("TWILIO_AUTH_TOKEN"),
            get_arc("TWILIO_WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                from,
                base_url: get_arc("TWILIO_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE_URL.into()),
            }),
            (None, None, None) => None,
            _ => {
                tracing::warn!("Twilio credentials partially configured, notifications disabled");
                None
            }
        };

        let admin_phones = get("ADMIN_WHATSAPP_NUMBERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into()),
            public_base_url: get("PUBLIC_BASE_URL")
                .map(|url| Arc::from(url.trim_end_matches('/'))),
            jeko,
            jeko_webhook_secret: get_arc("JEKO_WEBHOOK_SECRET"),
            twilio,
            templates: MessageTemplates {
                customer_confirmation: get_arc("TWILIO_WHATSAPP_TEMPLATE_CUSTOMER_CONFIRMATION"),
                admin_notification: get_arc("TWILIO_WHATSAPP_TEMPLATE_ADMIN_NOTIFICATION"),
            },
            admin_phones,
        })
    }
}
