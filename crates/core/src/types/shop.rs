//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The domain is not a `*.myshopify.com` host.
    #[error("shop domain must end with {suffix}")]
    WrongSuffix {
        /// Required suffix.
        suffix: &'static str,
    },
    /// The store handle contains a character outside `[a-z0-9-]`.
    #[error("shop handle contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A Shopify shop's permanent domain, e.g. `demo-store.myshopify.com`.
///
/// ## Constraints
///
/// - Lowercased and trimmed on parse
/// - Ends with `.myshopify.com`
/// - Store handle is non-empty and made of `a-z`, `0-9` and `-`
///
/// ## Examples
///
/// ```
/// use embedded_admin_core::ShopDomain;
///
/// assert!(ShopDomain::parse("demo-store.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("Demo-Store.MyShopify.com").is_ok());
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("example.com").is_err());
/// assert!(ShopDomain::parse(".myshopify.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Domain suffix every shop shares.
    pub const SUFFIX: &'static str = ".myshopify.com";

    /// Maximum length of a DNS name.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ShopDomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, lacks the
    /// `.myshopify.com` suffix, or has an invalid store handle.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let handle = s
            .strip_suffix(Self::SUFFIX)
            .filter(|h| !h.is_empty())
            .ok_or(ShopDomainError::WrongSuffix {
                suffix: Self::SUFFIX,
            })?;

        if let Some(c) = handle
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        Ok(Self(s))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the store handle (the part before `.myshopify.com`).
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let domain = ShopDomain::parse("demo-store.myshopify.com").unwrap();
        assert_eq!(domain.as_str(), "demo-store.myshopify.com");
        assert_eq!(domain.handle(), "demo-store");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let domain = ShopDomain::parse("  Demo-Store.MYSHOPIFY.com ").unwrap();
        assert_eq!(domain.as_str(), "demo-store.myshopify.com");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ShopDomain::parse("   "), Err(ShopDomainError::Empty));
    }

    #[test]
    fn test_parse_wrong_suffix() {
        assert!(matches!(
            ShopDomain::parse("demo.example.com"),
            Err(ShopDomainError::WrongSuffix { .. })
        ));
        assert!(matches!(
            ShopDomain::parse(".myshopify.com"),
            Err(ShopDomainError::WrongSuffix { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_handle() {
        assert_eq!(
            ShopDomain::parse("demo_store.myshopify.com"),
            Err(ShopDomainError::InvalidCharacter('_'))
        );
        assert_eq!(
            ShopDomain::parse("a.b.myshopify.com"),
            Err(ShopDomainError::InvalidCharacter('.'))
        );
    }

    #[test]
    fn test_too_long() {
        let long = format!("{}{}", "a".repeat(250), ShopDomain::SUFFIX);
        assert!(matches!(
            ShopDomain::parse(&long),
            Err(ShopDomainError::TooLong { .. })
        ));
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let domain: ShopDomain = serde_json::from_str("\"demo.myshopify.com\"").unwrap();
        assert_eq!(serde_json::to_string(&domain).unwrap(), "\"demo.myshopify.com\"");
        assert!(serde_json::from_str::<ShopDomain>("\"nope\"").is_err());
    }
}
