//! Webhook topics delivered by Shopify.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A webhook topic as sent in the `X-Shopify-Topic` header.
///
/// Topics this app does not subscribe to are kept verbatim in
/// [`WebhookTopic::Other`] so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookTopic {
    AppUninstalled,
    ShopUpdate,
    ProductsUpdate,
    ProductsDelete,
    CustomersDataRequest,
    CustomersRedact,
    ShopRedact,
    Other(String),
}

impl WebhookTopic {
    /// Returns the topic as Shopify spells it (`products/update`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AppUninstalled => "app/uninstalled",
            Self::ShopUpdate => "shop/update",
            Self::ProductsUpdate => "products/update",
            Self::ProductsDelete => "products/delete",
            Self::CustomersDataRequest => "customers/data_request",
            Self::CustomersRedact => "customers/redact",
            Self::ShopRedact => "shop/redact",
            Self::Other(topic) => topic,
        }
    }

    /// Mandatory privacy topics. They are registered in the app
    /// configuration and need no processing here.
    #[must_use]
    pub const fn is_compliance(&self) -> bool {
        matches!(
            self,
            Self::CustomersDataRequest | Self::CustomersRedact | Self::ShopRedact
        )
    }

    /// Topics whose backend call carries the shop HMAC header.
    #[must_use]
    pub const fn is_signed_forward(&self) -> bool {
        matches!(
            self,
            Self::AppUninstalled | Self::ShopUpdate | Self::ProductsUpdate | Self::ProductsDelete
        )
    }
}

impl FromStr for WebhookTopic {
    type Err = std::convert::Infallible;

    /// Accepts both `products/update` and the `PRODUCTS_UPDATE` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "/");
        let topic = match normalized.as_str() {
            "app/uninstalled" => Self::AppUninstalled,
            "shop/update" => Self::ShopUpdate,
            "products/update" => Self::ProductsUpdate,
            "products/delete" => Self::ProductsDelete,
            "customers/data/request" => Self::CustomersDataRequest,
            "customers/redact" => Self::CustomersRedact,
            "shop/redact" => Self::ShopRedact,
            _ => Self::Other(s.trim().to_string()),
        };
        Ok(topic)
    }
}

impl From<String> for WebhookTopic {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(topic) => topic,
            Err(never) => match never {},
        }
    }
}

impl From<WebhookTopic> for String {
    fn from(topic: WebhookTopic) -> Self {
        topic.as_str().to_string()
    }
}

impl fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
