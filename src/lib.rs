pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    domain::{
        provider::PaymentGateway,
        store::{NotificationQueue, OrderStore},
    },
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub queue: Arc<dyn NotificationQueue>,
    /// `None` when Jeko credentials are absent; issuing then fails with a
    /// configuration error.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub webhook_secret: Option<Arc<str>>,
    pub public_base_url: Option<Arc<str>>,
    pub admin_phones: Arc<[String]>,
}
