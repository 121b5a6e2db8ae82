//! Single-request execution pipeline.
//!
//! # Steps
//! ```text
//! descriptor
//!     → validate method (no I/O on failure)
//!     → encode body by body type
//!     → pre-request hooks (early → per call → late)
//!     → materialize reqwest::Request, apply query + headers
//!     → immediate hooks
//!     → transport execute, buffer body
//!     → decode into success sink (< 400) or failure sink (>= 400)
//! ```
//!
//! # Design Decisions
//! - No retries here; the multi-client drives attempts
//! - A decode failure still hands back the transport response

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::error::{MultiClientError, Result};
use crate::request::body;
use crate::request::descriptor::RequestDescriptor;
use crate::request::response::{Response, ResponseDecoder, ResponseSink};

static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

/// Sends descriptors over a transport and decodes the answers.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    decoder: Arc<ResponseDecoder>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::shared()
    }
}

impl Executor {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            decoder: Arc::new(ResponseDecoder::default()),
        }
    }

    /// Executor over the process-wide default client.
    pub fn shared() -> Self {
        Self::new(SHARED_CLIENT.clone())
    }

    /// Executor over a dedicated client with a whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }

    pub fn with_decoder(mut self, decoder: ResponseDecoder) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn decoder(&self) -> &ResponseDecoder {
        &self.decoder
    }

    /// Run the pipeline up to a buffered response, without decoding.
    pub async fn send(&self, mut descriptor: RequestDescriptor) -> Result<Response> {
        // 1. Validate method
        if !descriptor.is_supported_method() {
            return Err(MultiClientError::UnsupportedMethod(
                descriptor.method.to_string(),
            ));
        }

        // 2. Encode body
        let payload = std::mem::take(&mut descriptor.payload);
        descriptor.body = body::encode(descriptor.body_type, payload).await?;

        // 3. Pre-request hooks
        descriptor.run_hooks()?;

        // 4. Materialize, then immediate hooks
        let mut request = descriptor.materialize()?;
        descriptor.run_immediate_hooks(&mut request)?;

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            body_type = ?descriptor.body_type,
            "Sending request"
        );

        // 5. Execute
        let response = self.client.execute(request).await?;
        Ok(Response::read(response).await?)
    }

    /// Run the full pipeline and decode into the sink chosen by status.
    pub async fn perform<S, F>(
        &self,
        descriptor: RequestDescriptor,
        success: &mut S,
        failure: &mut F,
    ) -> Result<Response>
    where
        S: ResponseSink + Send + ?Sized,
        F: ResponseSink + Send + ?Sized,
    {
        let response = self.send(descriptor).await?;

        // 6. Decode
        let decoded = if response.is_success_status() {
            self.decoder.decode(&response, success)
        } else {
            self.decoder.decode(&response, failure)
        };

        match decoded {
            Ok(()) => Ok(response),
            Err(source) => Err(MultiClientError::Decode {
                response: Box::new(response),
                source,
            }),
        }
    }
}
