use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration: {0}")]
    Configuration(String),

    #[error("gateway: {message}")]
    Gateway {
        message: String,
        details: serde_json::Value,
    },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store: {0}")]
    Store(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("webhook signature: {0}")]
    WebhookSignature(String),
}

/// Twilio error code for freeform messages sent outside the 24h session window.
pub const OUTSIDE_WINDOW_CODE: i64 = 63016;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("messaging provider not configured")]
    NotConfigured,

    #[error("no recipient phone number")]
    MissingRecipient,

    #[error("recipient outside messaging window ({code}): {message}")]
    OutsideWindow { code: i64, message: String },

    #[error("messaging provider rejected message (http {status}, code {code:?}): {message}")]
    Provider {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("messaging transport: {0}")]
    Transport(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl NotificationError {
    /// Whether retrying the same message can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConfigured | Self::MissingRecipient | Self::OutsideWindow { .. } => false,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            Self::Pipeline(PipelineError::Validation(_) | PipelineError::NotFound(_)) => false,
            Self::Pipeline(_) => true,
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
