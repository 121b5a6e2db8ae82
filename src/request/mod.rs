//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! MultiClient::request (per attempt)
//!     → descriptor.rs (method, path, payload, base, headers, query, hooks)
//!     → executor.rs (validate → encode → hooks → materialize → send)
//!         → body.rs (payload encoding by body type)
//!         → hooks.rs (pre-request and immediate hooks)
//!     → response.rs (buffer, pick strategy by content type, decode into sink)
//! ```

pub mod body;
pub mod descriptor;
pub mod executor;
pub mod hooks;
pub mod response;

pub use body::{BodyType, BufferedPayload, Payload};
pub use descriptor::RequestDescriptor;
pub use executor::Executor;
pub use hooks::{HookError, ImmediateHook, PreRequestHook, RequestIdHook, SharedHook, SharedImmediateHook};
pub use response::{DecodeError, DecodeStrategy, Discard, Response, ResponseDecoder, ResponseSink};
