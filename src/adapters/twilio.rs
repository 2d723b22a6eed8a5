use {
    crate::{
        config::TwilioCredentials,
        domain::{
            error::{NotificationError, OUTSIDE_WINDOW_CODE},
            notification::{MessageContent, MessageReceipt, OutboundMessage},
            provider::{BoxFuture, Messenger},
        },
    },
    serde::Deserialize,
    std::time::Duration,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResource {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// WhatsApp over the Twilio Messages API.
pub struct TwilioMessenger {
    http: reqwest::Client,
    credentials: TwilioCredentials,
}

impl TwilioMessenger {
    pub fn new(credentials: TwilioCredentials) -> Result<Self, NotificationError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, credentials })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.credentials.base_url.trim_end_matches('/'),
            self.credentials.account_sid
        )
    }

    async fn send_inner(&self, message: OutboundMessage) -> Result<MessageReceipt, NotificationError> {
        let mut form: Vec<(&str, String)> = vec![
            ("From", self.credentials.from.to_string()),
            ("To", message.to),
        ];
        match message.content {
            MessageContent::Template {
                content_sid,
                variables,
            } => {
                form.push(("ContentSid", content_sid));
                form.push((
                    "ContentVariables",
                    serde_json::to_string(&variables).map_err(|e| {
                        NotificationError::Transport(format!("content variables: {e}"))
                    })?,
                ));
            }
            MessageContent::Freeform { body } => form.push(("Body", body)),
        }

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(
                &*self.credentials.account_sid,
                Some(&*self.credentials.auth_token),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let resource: MessageResource = serde_json::from_str(&text)
                .map_err(|e| NotificationError::Transport(format!("unexpected Twilio response: {e}")))?;
            return Ok(MessageReceipt {
                sid: resource.sid,
                status: resource.status,
            });
        }

        let error: ErrorResource = serde_json::from_str(&text).unwrap_or_default();
        Err(classify_error(status.as_u16(), error.code, error.message.unwrap_or(text)))
    }
}

fn classify_error(status: u16, code: Option<i64>, message: String) -> NotificationError {
    match code {
        Some(OUTSIDE_WINDOW_CODE) => NotificationError::OutsideWindow {
            code: OUTSIDE_WINDOW_CODE,
            message,
        },
        code => NotificationError::Provider {
            status,
            code,
            message,
        },
    }
}

impl Messenger for TwilioMessenger {
    fn send(&self, message: OutboundMessage) -> BoxFuture<'_, Result<MessageReceipt, NotificationError>> {
        Box::pin(self.send_inner(message))
    }
}
