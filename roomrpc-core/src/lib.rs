//! # Roomrpc Core
//!
//! `roomrpc-core` binds a declared set of methods to a pluggable transport. Once bound,
//! calling a method locally serializes a request envelope, hands it to the transport and
//! resolves with the remote result (or rejects with the remote error).
//!
//! ## Key Components
//!
//! * **[`Service`]:** A registry of named methods. Methods can be registered before or after
//!   a client is bound; late registrations are wired through the same RPC path.
//! * **[`Client`]:** The binder. [`Client::bind`] swaps the invocation strategy of every
//!   method of a service (present and future) for one that performs a round trip over the
//!   given [`Transport`].
//! * **[`Transport`]:** The contract every transport satisfies: `open`, one exchange, `close`.
//!   [`TransportExt::send`] drives that lifecycle, with `close` guaranteed even when the
//!   exchange fails.
//! * **[`HttpTransport`]:** The reference transport. One `POST` per call, HTTP status codes
//!   mapped to RPC outcomes.
//!
//! ## Wire format
//!
//! ```text
//! request:  { "id": "<string>", "name": "<string>", "params": <any> }
//! response: { "result": <any> } | { "error": { "message": "<string>", "type": "<string>" } }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use roomrpc_core::{Client, HttpTransport, HttpTransportConfig, Service};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Service::new();
//! service.register("ping")?;
//!
//! let transport = HttpTransport::new(
//!     HttpTransportConfig::new("http://localhost:3030").header("authorization", "Bearer token"),
//! )?;
//!
//! let client = Client::bind(service, transport);
//! let pong = client.call("ping", json!({ "x": 1 })).await?;
//! # Ok(())
//! # }
//! ```
pub mod client;
pub mod envelope;
pub mod id;
pub mod service;
pub mod transport;

pub use client::{CallError, Client};
pub use envelope::{ErrorInfo, RequestEnvelope, ResponseEnvelope};
pub use id::{IdGenerator, UuidV4};
pub use service::{Invocable, Method, RegisterError, Service, from_fn};
pub use transport::http::{Credentials, HttpTransport, HttpTransportBuildError, HttpTransportConfig};
pub use transport::{TRANSPORT_ERROR_TYPE, Transport, TransportExt};
