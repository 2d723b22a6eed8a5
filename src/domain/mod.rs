pub mod error;
pub mod id;
pub mod money;
pub mod notification;
pub mod order;
pub mod provider;
pub mod store;
pub mod webhook;
