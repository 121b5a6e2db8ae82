//! Pre-request hooks.
//!
//! # Hook Kinds
//! ```text
//! PreRequestHook   &mut RequestDescriptor   runs before materialization
//!                                           order: client early → per call → client late
//! ImmediateHook    &mut reqwest::Request     runs after query/headers are applied
//! ```
//!
//! Any hook may abort the request by returning a `HookError`.

use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use uuid::Uuid;

use crate::request::descriptor::RequestDescriptor;

/// Header stamped by [`RequestIdHook`].
pub const X_REQUEST_ID: &str = "x-request-id";

/// Error returned by a hook to abort the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Hook that mutates the request descriptor before it is materialized.
pub trait PreRequestHook: Send + Sync {
    fn before_request(&self, descriptor: &mut RequestDescriptor) -> Result<(), HookError>;
}

impl<F> PreRequestHook for F
where
    F: Fn(&mut RequestDescriptor) -> Result<(), HookError> + Send + Sync,
{
    fn before_request(&self, descriptor: &mut RequestDescriptor) -> Result<(), HookError> {
        self(descriptor)
    }
}

/// Hook that sees the materialized transport request, right before send.
pub trait ImmediateHook: Send + Sync {
    fn on_request(&self, request: &mut reqwest::Request) -> Result<(), HookError>;
}

impl<F> ImmediateHook for F
where
    F: Fn(&mut reqwest::Request) -> Result<(), HookError> + Send + Sync,
{
    fn on_request(&self, request: &mut reqwest::Request) -> Result<(), HookError> {
        self(request)
    }
}

pub type SharedHook = Arc<dyn PreRequestHook>;
pub type SharedImmediateHook = Arc<dyn ImmediateHook>;

/// Adds a UUID v4 `x-request-id` header unless the request already carries one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdHook;

impl ImmediateHook for RequestIdHook {
    fn on_request(&self, request: &mut reqwest::Request) -> Result<(), HookError> {
        let name = HeaderName::from_static(X_REQUEST_ID);
        if request.headers().contains_key(&name) {
            return Ok(());
        }
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string())
            .map_err(|e| HookError::new(e.to_string()))?;
        request.headers_mut().insert(name, value);
        Ok(())
    }
}
