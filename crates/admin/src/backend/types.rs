//! Backend response envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code carried in a backend response envelope.
///
/// Usually mirrors the HTTP status, but the backend may report its own code
/// in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCode(pub u16);

impl ResponseCode {
    pub const SUCCESS: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const BAD_REQUEST: Self = Self(400);
    pub const UNAUTHORIZED: Self = Self(401);
    pub const NOT_FOUND: Self = Self(404);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Only `200` and `201` count as success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.0, 200 | 201)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl Default for ResponseCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<reqwest::StatusCode> for ResponseCode {
    fn from(status: reqwest::StatusCode) -> Self {
        Self(status.as_u16())
    }
}

/// Result of a backend call. Failures are folded in rather than returned
/// as `Err`, so callers branch on [`ApiResponse::is_success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status_code: ResponseCode,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A failed call with no payload.
    #[must_use]
    pub fn failure(status_code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data: None,
            message: message.into(),
            error_code: None,
        }
    }

    /// A successful call without a body.
    #[must_use]
    pub const fn empty(status_code: ResponseCode) -> Self {
        Self {
            status_code,
            data: None,
            message: String::new(),
            error_code: None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// The payload of a successful call.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        if self.is_success() { self.data } else { None }
    }
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}
