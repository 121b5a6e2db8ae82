//! Client-side load balancing over a pool of equivalent HTTP endpoints.
//!
//! A [`MultiClient`] tracks which endpoints pass health checks, picks one at
//! random for each attempt and retries failed attempts on a fresh pick. Each
//! attempt runs the [`request`] pipeline: body encoding, hooks, transport and
//! content-type driven response decoding.

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod request;

pub use client::MultiClient;
pub use config::MultiClientConfig;
pub use error::{MultiClientError, Result};
pub use health::CheckPolicy;
pub use lifecycle::Shutdown;
pub use request::{BodyType, Payload, Response};
