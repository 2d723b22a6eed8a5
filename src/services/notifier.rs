use {
    crate::{
        config::MessageTemplates,
        domain::{
            error::{NotificationError, PipelineError},
            notification::{
                Audience, MessageContent, MessageReceipt, NotificationJob, OutboundMessage,
                admin_alert_body, admin_template_variables, admin_whatsapp_address,
                customer_confirmation_body, customer_template_variables,
                customer_whatsapp_address,
            },
            order::Order,
            provider::Messenger,
            store::OrderStore,
        },
    },
    std::{collections::BTreeMap, sync::Arc},
};

/// Sends the WhatsApp message behind one notification job.
#[derive(Clone)]
pub struct NotificationDispatcher {
    messenger: Option<Arc<dyn Messenger>>,
    templates: MessageTemplates,
}

impl NotificationDispatcher {
    pub fn new(messenger: Option<Arc<dyn Messenger>>, templates: MessageTemplates) -> Self {
        Self {
            messenger,
            templates,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.messenger.is_some()
    }

    /// Deliver one job. Errors say whether a retry can help, see
    /// [`NotificationError::is_retryable`].
    pub async fn deliver(
        &self,
        store: &dyn OrderStore,
        job: &NotificationJob,
    ) -> Result<MessageReceipt, NotificationError> {
        let messenger = self
            .messenger
            .as_deref()
            .ok_or(NotificationError::NotConfigured)?;
        let order = store
            .get_order(job.order_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("order {}", job.order_id)))?;

        match &job.audience {
            Audience::Customer => {
                let to = order
                    .customer_phone
                    .as_deref()
                    .and_then(customer_whatsapp_address)
                    .ok_or(NotificationError::MissingRecipient)?;
                let template = self
                    .templates
                    .customer_confirmation
                    .as_deref()
                    .map(|sid| (sid, customer_template_variables(&order)));
                let body = async { Ok(customer_confirmation_body(&order)) };
                send_with_fallback(messenger, to, template, body).await
            }
            Audience::Admin { phone } => {
                let to = admin_whatsapp_address(phone);
                let template = self
                    .templates
                    .admin_notification
                    .as_deref()
                    .map(|sid| (sid, admin_template_variables(&order)));
                // Items are only read if the freeform fallback runs.
                send_with_fallback(messenger, to, template, admin_body(store, &order)).await
            }
        }
    }
}

async fn admin_body(store: &dyn OrderStore, order: &Order) -> Result<String, NotificationError> {
    let items = store.list_items(order.id).await?;
    Ok(admin_alert_body(order, &items))
}

/// Approved template first; on any template failure, one freeform attempt.
/// `freeform` is only awaited when that attempt happens.
async fn send_with_fallback(
    messenger: &dyn Messenger,
    to: String,
    template: Option<(&str, BTreeMap<String, String>)>,
    freeform: impl Future<Output = Result<String, NotificationError>>,
) -> Result<MessageReceipt, NotificationError> {
    if let Some((content_sid, variables)) = template {
        let message = OutboundMessage {
            to: to.clone(),
            content: MessageContent::Template {
                content_sid: content_sid.to_string(),
                variables,
            },
        };
        match messenger.send(message).await {
            Ok(receipt) => return Ok(receipt),
            Err(e) => {
                tracing::warn!(%to, error = %e, "template send failed, falling back to freeform");
            }
        }
    }

    let body = freeform.await?;
    messenger
        .send(OutboundMessage {
            to,
            content: MessageContent::Freeform { body },
        })
        .await
}
