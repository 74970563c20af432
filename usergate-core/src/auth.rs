//! Bearer token gate
//!
//! Every request under the protected prefix carries an `Authorization`
//! header of the form `Bearer <token>`. The gate strips the prefix and
//! compares the remainder with the single configured token. Anything other
//! than an exact byte match is rejected, and every rejection looks the same
//! to the caller.

use crate::error::{Result, UsergateError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the credential
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Scheme marker that must open the header value, including the space
pub const TOKEN_PREFIX: &str = "Bearer ";

/// Why a request was turned away
///
/// The reason is for logs and metrics. Callers always see the same
/// unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// No `Authorization` header on the request
    MissingHeader,
    /// Header present but not `Bearer <token>` (or not valid UTF-8)
    MalformedHeader,
    /// Token does not match the configured one
    InvalidToken,
}

impl Rejection {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingHeader => "missing_header",
            Rejection::MalformedHeader => "malformed_header",
            Rejection::InvalidToken => "invalid_token",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingHeader => write!(f, "missing {} header", AUTHORIZATION_HEADER),
            Rejection::MalformedHeader => {
                write!(f, "{} header is not a bearer credential", AUTHORIZATION_HEADER)
            }
            Rejection::InvalidToken => write!(f, "bearer token does not match"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Stateless allow/deny check against one configured token
#[derive(Clone)]
pub struct BearerGate {
    token: Arc<str>,
}

impl BearerGate {
    /// Create a gate for the given token
    ///
    /// An empty token is refused, otherwise `Bearer ` alone would pass.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(UsergateError::ConfigError(
                "auth token must not be empty".to_string(),
            ));
        }
        Ok(BearerGate {
            token: Arc::from(token.into_boxed_str()),
        })
    }

    /// Check an `Authorization` header value
    pub fn check(&self, header: Option<&str>) -> std::result::Result<(), Rejection> {
        let header = header.ok_or(Rejection::MissingHeader)?;
        let candidate = header
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(Rejection::MalformedHeader)?;

        if self.accepts(candidate) {
            Ok(())
        } else {
            Err(Rejection::InvalidToken)
        }
    }

    /// Check a raw header value as it came off the wire
    pub fn check_bytes(&self, header: Option<&[u8]>) -> std::result::Result<(), Rejection> {
        match header {
            None => Err(Rejection::MissingHeader),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(value) => self.check(Some(value)),
                Err(_) => Err(Rejection::MalformedHeader),
            },
        }
    }

    /// Compare a candidate token with the configured one
    pub fn accepts(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        // Unequal lengths compare unequal without inspecting contents.
        candidate.as_bytes().ct_eq(self.token.as_bytes()).into()
    }
}

impl fmt::Debug for BearerGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerGate")
            .field("token", &"<redacted>")
            .finish()
    }
}
