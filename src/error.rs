//! Crate-wide error definitions.
//!
//! # Taxonomy
//! - Configuration: bad method, empty pool, unparsable URL/header/pattern,
//!   payload shape that the body type cannot encode
//! - Health: tracker suspended, not enough endpoints passed a check
//! - Selection: no address available for this attempt
//! - Transient: encoding, hooks, transport and decoding failures of one attempt
//!
//! Only transient errors are retried by the request driver.

use thiserror::Error;

use crate::request::body::BodyType;
use crate::request::hooks::HookError;
use crate::request::response::{DecodeError, Response};

/// Errors produced by the multi-endpoint client.
#[derive(Debug, Error)]
pub enum MultiClientError {
    /// Method outside GET/POST/PUT/DELETE/HEAD/PATCH.
    #[error("Unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    /// The endpoint pool is empty.
    #[error("No addresses found")]
    NoAddresses,

    /// Health checks are enabled and no recorded endpoint is usable.
    #[error("No healthy addresses found")]
    NoHealthyAddresses,

    /// A health check ran while the tracker was suspended.
    #[error("Client is not active")]
    Inactive,

    /// A health check finished with fewer passing endpoints than required.
    #[error("Not enough healthy addresses configured to meet requested minimum: want {want}, have {have}")]
    InsufficientHealthy { want: usize, have: usize },

    /// The payload shape cannot be encoded as the requested body type.
    #[error("Cannot encode {payload} payload as {body_type:?} body")]
    PayloadMismatch {
        body_type: BodyType,
        payload: &'static str,
    },

    /// Body serialization failed.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// Base address or path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value rejected by the transport.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// Health-check match pattern failed to compile.
    #[error("Invalid health check pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A pre-request or immediate hook aborted the request.
    #[error("Hook aborted request: {0}")]
    Hook(#[from] HookError),

    /// Reading a streamed payload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport could not complete the exchange.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered but the body could not be decoded.
    ///
    /// The full response is kept so callers can still inspect status and headers.
    #[error("Failed to decode {} response: {source}", .response.status())]
    Decode {
        response: Box<Response>,
        #[source]
        source: DecodeError,
    },

    /// No attempt was made (retry limit of zero).
    #[error("Exceeded retry limit for request")]
    RetryLimitExceeded,
}

impl MultiClientError {
    /// True for errors raised while choosing an endpoint.
    ///
    /// These abort the retry loop immediately.
    pub fn is_selection_error(&self) -> bool {
        matches!(self, Self::NoAddresses | Self::NoHealthyAddresses)
    }

    /// The transport response attached to a decode failure, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Decode { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }
}

/// Result type for multi-client operations.
pub type Result<T> = std::result::Result<T, MultiClientError>;
