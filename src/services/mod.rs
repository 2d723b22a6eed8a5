pub mod notifier;
pub mod order_creator;
pub mod payment_issuer;
pub mod webhook_receiver;
pub mod worker;
