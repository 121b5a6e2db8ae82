//! Request payloads and body encoding.
//!
//! # Encoding Table
//! ```text
//! BodyType   Structured           Text / Bytes / Stream
//! Json       serde_json           text as a JSON string, else PayloadMismatch
//! Form       serde_urlencoded     PayloadMismatch
//! Raw        PayloadMismatch      bytes as-is
//! Xml        PayloadMismatch      <body>escaped text</body>
//! ```
//! An empty payload never produces a body, whatever the body type.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{MultiClientError, Result};

/// Root element used when framing raw content as an XML body.
pub const XML_BODY_ELEMENT: &str = "body";

/// How a payload is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Raw,
    Xml,
    #[default]
    Json,
    Form,
}

impl BodyType {
    /// Content-Type header sent with bodies of this type.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::Raw => None,
            BodyType::Xml => Some("text/xml"),
            BodyType::Json => Some("application/json"),
            BodyType::Form => Some("application/x-www-form-urlencoded"),
        }
    }
}

/// Boxed async reader accepted as a streamed payload.
pub type PayloadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Request payload as supplied by the caller.
#[derive(Default)]
pub enum Payload {
    #[default]
    Empty,
    Stream(PayloadStream),
    Text(String),
    Bytes(Bytes),
    Structured(serde_json::Value),
}

impl Payload {
    /// Serialize any value into a structured payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Payload::Structured)
            .map_err(|e| MultiClientError::Encode(e.to_string()))
    }

    /// Wrap an async reader.
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Payload::Stream(Box::new(reader))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Short name of the payload shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Stream(_) => "stream",
            Payload::Text(_) => "text",
            Payload::Bytes(_) => "bytes",
            Payload::Structured(_) => "structured",
        }
    }

    /// Drain a streamed payload into memory so it can be sent more than once.
    pub async fn buffered(self) -> std::io::Result<BufferedPayload> {
        Ok(match self {
            Payload::Empty => BufferedPayload::Empty,
            Payload::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                BufferedPayload::Bytes(Bytes::from(buf))
            }
            Payload::Text(text) => BufferedPayload::Text(text),
            Payload::Bytes(bytes) => BufferedPayload::Bytes(bytes),
            Payload::Structured(value) => BufferedPayload::Structured(value),
        })
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Stream(_) => f.write_str("Stream(..)"),
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Payload::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Structured(value)
    }
}

/// A payload held fully in memory; cheap to clone for each attempt.
#[derive(Debug, Clone, Default)]
pub enum BufferedPayload {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Structured(serde_json::Value),
}

impl From<BufferedPayload> for Payload {
    fn from(buffered: BufferedPayload) -> Self {
        match buffered {
            BufferedPayload::Empty => Payload::Empty,
            BufferedPayload::Text(text) => Payload::Text(text),
            BufferedPayload::Bytes(bytes) => Payload::Bytes(bytes),
            BufferedPayload::Structured(value) => Payload::Structured(value),
        }
    }
}

/// Wire-ready body plus the content type it implies.
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub content_type: Option<&'static str>,
}

/// Encode a payload according to the body type.
pub async fn encode(body_type: BodyType, payload: Payload) -> Result<Option<EncodedBody>> {
    if payload.is_empty() {
        return Ok(None);
    }

    let bytes = match body_type {
        BodyType::Json => match payload {
            Payload::Structured(value) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| MultiClientError::Encode(e.to_string()))?,
            Payload::Text(text) => serde_json::to_vec(&text)
                .map(Bytes::from)
                .map_err(|e| MultiClientError::Encode(e.to_string()))?,
            other => return Err(mismatch(body_type, &other)),
        },
        BodyType::Form => match payload {
            Payload::Structured(value) => serde_urlencoded::to_string(&value)
                .map(Bytes::from)
                .map_err(|e| MultiClientError::Encode(e.to_string()))?,
            other => return Err(mismatch(body_type, &other)),
        },
        BodyType::Raw => read_raw(body_type, payload).await?,
        BodyType::Xml => {
            let raw = read_raw(body_type, payload).await?;
            let text = std::str::from_utf8(&raw)
                .map_err(|e| MultiClientError::Encode(format!("XML body is not UTF-8: {}", e)))?;
            quick_xml::se::to_string_with_root(XML_BODY_ELEMENT, text)
                .map(Bytes::from)
                .map_err(|e| MultiClientError::Encode(e.to_string()))?
        }
    };

    Ok(Some(EncodedBody {
        bytes,
        content_type: body_type.content_type(),
    }))
}

async fn read_raw(body_type: BodyType, payload: Payload) -> Result<Bytes> {
    match payload {
        Payload::Stream(mut reader) => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            Ok(Bytes::from(buf))
        }
        Payload::Text(text) => Ok(Bytes::from(text)),
        Payload::Bytes(bytes) => Ok(bytes),
        other => Err(mismatch(body_type, &other)),
    }
}

fn mismatch(body_type: BodyType, payload: &Payload) -> MultiClientError {
    MultiClientError::PayloadMismatch {
        body_type,
        payload: payload.kind(),
    }
}
