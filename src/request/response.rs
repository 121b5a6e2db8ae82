//! Response buffering and content-type driven decoding.
//!
//! # Dispatch Table
//! ```text
//! Content-Type (before ';', trimmed, lower-cased)
//!     application/json, text/json → Json
//!     text/xml                    → Xml
//!     anything else / missing     → fallback (Xml unless configured otherwise)
//! ```
//!
//! # Design Decisions
//! - The body is buffered once so the response survives a decode failure
//! - Empty bodies are not decoded; the sink is left untouched
//! - Strategy depends on the response content type, never on the request body type

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Fully buffered transport response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl Response {
    /// Buffer a transport response.
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Status below 400 routes to the success sink.
    pub fn is_success_status(&self) -> bool {
        self.status.as_u16() < 400
    }
}

/// How a response body is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeStrategy {
    Json,
    #[default]
    Xml,
    Text,
}

/// Errors raised while decoding a response body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML decode error: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("Text decode error: {0}")]
    Text(String),
}

/// Destination for a decoded response body.
pub trait ResponseSink {
    fn decode(&mut self, strategy: DecodeStrategy, body: &[u8]) -> Result<(), DecodeError>;
}

impl<T: DeserializeOwned> ResponseSink for Option<T> {
    fn decode(&mut self, strategy: DecodeStrategy, body: &[u8]) -> Result<(), DecodeError> {
        let value = match strategy {
            DecodeStrategy::Json => serde_json::from_slice(body)?,
            DecodeStrategy::Xml => quick_xml::de::from_reader(body)?,
            DecodeStrategy::Text => {
                let text =
                    std::str::from_utf8(body).map_err(|e| DecodeError::Text(e.to_string()))?;
                let deserializer: StrDeserializer<'_, serde::de::value::Error> =
                    text.into_deserializer();
                T::deserialize(deserializer).map_err(|e| DecodeError::Text(e.to_string()))?
            }
        };
        *self = Some(value);
        Ok(())
    }
}

/// Sink that accepts and drops any body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl ResponseSink for Discard {
    fn decode(&mut self, _strategy: DecodeStrategy, _body: &[u8]) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Maps normalized content types to decoding strategies.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    strategies: HashMap<String, DecodeStrategy>,
    fallback: DecodeStrategy,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        let strategies = HashMap::from([
            ("application/json".to_string(), DecodeStrategy::Json),
            ("text/json".to_string(), DecodeStrategy::Json),
            ("text/xml".to_string(), DecodeStrategy::Xml),
        ]);
        Self {
            strategies,
            fallback: DecodeStrategy::default(),
        }
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an additional content type.
    pub fn register(mut self, content_type: &str, strategy: DecodeStrategy) -> Self {
        self.strategies.insert(normalize(content_type), strategy);
        self
    }

    /// Strategy for content types that have no mapping.
    pub fn with_fallback(mut self, strategy: DecodeStrategy) -> Self {
        self.fallback = strategy;
        self
    }

    pub fn fallback(&self) -> DecodeStrategy {
        self.fallback
    }

    pub fn strategy_for(&self, content_type: Option<&str>) -> DecodeStrategy {
        content_type
            .and_then(|ct| self.strategies.get(&normalize(ct)))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn decode<S>(&self, response: &Response, sink: &mut S) -> Result<(), DecodeError>
    where
        S: ResponseSink + ?Sized,
    {
        if response.body().is_empty() {
            return Ok(());
        }
        let strategy = self.strategy_for(response.content_type());
        tracing::trace!(
            status = %response.status(),
            content_type = ?response.content_type(),
            strategy = ?strategy,
            "Decoding response body"
        );
        sink.decode(strategy, response.body())
    }
}

fn normalize(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
