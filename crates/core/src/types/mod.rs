//! Validated types shared by the admin server.

pub mod shop;
pub mod webhook;

pub use shop::{ShopDomain, ShopDomainError};
pub use webhook::WebhookTopic;
