/// Fetch outcome classes for a single HTTP request
///
/// Every request made by the pool lands in exactly one of these classes.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents how a fetch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    /// 2xx response with a readable body
    Success,

    /// 3xx response; the target is reported through the Location header
    Redirect,

    /// 4xx response (permanent, never retried)
    ClientError,

    /// 5xx response (recorded as failed, never retried)
    ServerError,

    /// The request did not complete within the configured timeout
    Timeout,

    /// Connection refused, reset, DNS or TLS failure
    ConnectionError,
}

impl FetchState {
    /// Returns true for failures worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionError)
    }

    /// Returns true if this outcome counts as a failed fetch
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success | Self::Redirect)
    }

    /// Returns the snake_case name used in logs and ledger documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
