//! Request descriptor: one outbound call before it reaches the wire.
//!
//! # Responsibilities
//! - Hold method, path, payload, body type and the selected base address
//! - Carry headers and query parameters (unique keys, last write wins)
//! - Carry the ordered pre-request hook chain and the immediate hooks
//! - Materialize into a `reqwest::Request`
//!
//! # Design Decisions
//! - A descriptor is built fresh for every attempt; it is consumed by send
//! - The base address always ends in `/` and the path is resolved against it
//!   with RFC 3986 rules, so `/abs` replaces any base path while `rel` extends it

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::error::{MultiClientError, Result};
use crate::request::body::{BodyType, EncodedBody, Payload};
use crate::request::hooks::{SharedHook, SharedImmediateHook};

/// Methods the executor will send.
pub const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::PATCH,
];

pub fn is_supported_method(method: &Method) -> bool {
    SUPPORTED_METHODS.contains(method)
}

/// Parse a method name, accepting only the supported set.
pub fn parse_method(name: &str) -> Result<Method> {
    let upper = name.trim().to_ascii_uppercase();
    match Method::from_bytes(upper.as_bytes()) {
        Ok(method) if is_supported_method(&method) => Ok(method),
        _ => Err(MultiClientError::UnsupportedMethod(name.to_string())),
    }
}

/// Turn a pool address into a base URL ending in `/`.
///
/// Addresses without a scheme are treated as `http://`.
pub fn base_url_for(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        format!("{}/", trimmed)
    } else {
        format!("http://{}/", trimmed)
    }
}

/// In-memory representation of one outbound call.
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub payload: Payload,
    pub body_type: BodyType,
    /// Encoded body; filled in by the executor before hooks run.
    pub body: Option<EncodedBody>,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    base_url: String,
    hooks: Vec<SharedHook>,
    immediate_hooks: Vec<SharedImmediateHook>,
}

impl RequestDescriptor {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        payload: impl Into<Payload>,
        body_type: BodyType,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            payload: payload.into(),
            body_type,
            body: None,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            base_url: String::new(),
            hooks: Vec::new(),
            immediate_hooks: Vec::new(),
        }
    }

    pub fn set_base_url(&mut self, address: &str) {
        self.base_url = base_url_for(address);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_supported_method(&self) -> bool {
        is_supported_method(&self.method)
    }

    /// Set a header, replacing any previous value for the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a query parameter, replacing any previous value for the same key.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn merge_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.into(), value.into());
        }
    }

    pub fn merge_query<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.query.insert(key.into(), value.into());
        }
    }

    /// Append hooks to the end of the pre-request chain.
    pub fn append_hooks<'a, I>(&mut self, hooks: I)
    where
        I: IntoIterator<Item = &'a SharedHook>,
    {
        self.hooks.extend(hooks.into_iter().cloned());
    }

    /// Insert hooks at the front of the pre-request chain, keeping their order.
    pub fn prepend_hooks<'a, I>(&mut self, hooks: I)
    where
        I: IntoIterator<Item = &'a SharedHook>,
    {
        let mut chain: Vec<SharedHook> = hooks.into_iter().cloned().collect();
        chain.append(&mut self.hooks);
        self.hooks = chain;
    }

    pub fn add_immediate_hooks<'a, I>(&mut self, hooks: I)
    where
        I: IntoIterator<Item = &'a SharedImmediateHook>,
    {
        self.immediate_hooks.extend(hooks.into_iter().cloned());
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run the pre-request chain in order; the first error aborts.
    pub fn run_hooks(&mut self) -> Result<()> {
        let hooks = self.hooks.clone();
        for hook in &hooks {
            hook.before_request(self)?;
        }
        Ok(())
    }

    /// Run the immediate hooks against a materialized request.
    pub fn run_immediate_hooks(&self, request: &mut reqwest::Request) -> Result<()> {
        for hook in &self.immediate_hooks {
            hook.on_request(request)?;
        }
        Ok(())
    }

    /// Resolve the path against the base address.
    pub fn url(&self) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| MultiClientError::InvalidUrl(format!("{} ({})", self.base_url, e)))?;
        base.join(&self.path)
            .map_err(|e| MultiClientError::InvalidUrl(format!("{} ({})", self.path, e)))
    }

    /// Build the transport request: URL, body, then query and headers.
    pub fn materialize(&self) -> Result<reqwest::Request> {
        let mut url = self.url()?;

        if !self.query.is_empty() {
            let retained: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| !self.query.contains_key(&**key))
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(retained);
            pairs.extend_pairs(self.query.iter());
        }

        let mut request = reqwest::Request::new(self.method.clone(), url);

        if let Some(body) = &self.body {
            if let Some(content_type) = body.content_type {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            *request.body_mut() = Some(body.bytes.clone().into());
        }

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| MultiClientError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| MultiClientError::InvalidHeader(name.clone()))?;
            request.headers_mut().insert(header_name, header_value);
        }

        Ok(request)
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("body_type", &self.body_type)
            .field("payload", &self.payload)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("hooks", &self.hooks.len())
            .field("immediate_hooks", &self.immediate_hooks.len())
            .finish()
    }
}
