//! # Roomrpc Client
//!
//! This module implements the binder: [`Client::bind`] reroutes every method of a [`Service`]
//! through a [`Transport`].
//!
//! Binding is a side effect on the service. Every method that exists at bind time, and every
//! method registered afterwards while the client is alive, has its invocation strategy
//! replaced by one that:
//!
//! 1. builds a [`crate::RequestEnvelope`] with a fresh id and the method's qualified name;
//! 2. serializes it and awaits [`crate::TransportExt::send`];
//! 3. maps the outcome:
//!    * transport failure: [`CallError::Transport`], passed through unchanged;
//!    * no body: `Value::Null`;
//!    * a body that is not a response envelope: [`CallError::InvalidResponseFormat`];
//!    * a truthy `error` field: [`CallError::Remote`] with that exact value;
//!    * otherwise the `result` field.
//!
//! There are no retries and no timeout at this layer. Concurrent calls are independent and
//! may complete in any order.
//!
//! The service only keeps a weak reference to the binding. The transport lives as long as the
//! client (or a clone of it) or any method still routed through it, and binding the service
//! again releases the previous transport.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roomrpc_core::{Client, HttpTransport, HttpTransportConfig, Service};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Service::with_namespace("users");
//! let transport = HttpTransport::new(HttpTransportConfig::new("http://localhost:3030"))?;
//! let client = Client::bind(service.clone(), transport);
//!
//! // Registered after binding: still goes over the wire, as "users.get".
//! let get = service.register("get")?;
//! let user = get.call(json!({ "id": 1 })).await?;
//! # Ok(())
//! # }
//! ```
mod invoker;

use crate::{
    envelope::ErrorInfo,
    id::{IdGenerator, UuidV4},
    service::{Invocable, Service},
    transport::Transport,
};
use invoker::RpcInvoker;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};
use tracing::info;

/// `type` tag reported by [`CallError::info`] for unparseable responses.
pub const RESPONSE_FORMAT_ERROR_TYPE: &str = "ResponseFormatError";

/// `type` tag reported by [`CallError::info`] for remote errors that carry none.
pub const REMOTE_ERROR_TYPE: &str = "RemoteError";

/// Errors that can occur when calling a method.
///
/// The first three variants are the outcomes of a round trip; the others come from the local
/// registry and the typed wrappers.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Transport error: '{0}'")]
    Transport(#[source] ErrorInfo),
    #[error("Invalid response format")]
    InvalidResponseFormat,
    #[error("Remote error: '{0}'")]
    Remote(Value),
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Method '{0}' is not bound to a transport")]
    NotBound(String),
    #[error("Failed to serialize params: '{0}'")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to decode result: '{0}'")]
    Decode(#[source] serde_json::Error),
}

impl CallError {
    /// A `{ message, type }` view of the failure.
    ///
    /// Transport errors are returned unchanged and remote errors are read from their payload.
    pub fn info(&self) -> ErrorInfo {
        match self {
            CallError::Transport(info) => info.clone(),
            CallError::Remote(value) => {
                let message = value
                    .get("message")
                    .and_then(Value::as_str)
                    .or_else(|| value.as_str())
                    .map(str::to_owned)
                    .unwrap_or_else(|| value.to_string());
                let kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or(REMOTE_ERROR_TYPE);
                ErrorInfo::new(message, kind)
            }
            CallError::InvalidResponseFormat => {
                ErrorInfo::new(self.to_string(), RESPONSE_FORMAT_ERROR_TYPE)
            }
            CallError::MethodNotFound(_) => ErrorInfo::new(self.to_string(), "MethodNotFound"),
            CallError::NotBound(_) => ErrorInfo::new(self.to_string(), "NotBound"),
            CallError::Serialize(_) => ErrorInfo::new(self.to_string(), "SerializeError"),
            CallError::Decode(_) => ErrorInfo::new(self.to_string(), "DecodeError"),
        }
    }
}

/// A service bound to a transport.
///
/// Cloning is cheap: clones share the service registry and the transport.
pub struct Client<T> {
    service: Service,
    transport: Arc<T>,
    binding: Arc<dyn Invocable>,
}

impl<T> Client<T>
where
    T: Transport + 'static,
{
    /// Binds `service` to `transport`, using random UUIDs as request ids.
    pub fn bind(service: Service, transport: T) -> Self {
        Self::bind_with_ids(service, transport, Arc::new(UuidV4))
    }

    /// Alias of [`Client::bind`].
    pub fn of(service: Service, transport: T) -> Self {
        Self::bind(service, transport)
    }

    /// Binds `service` to `transport` with a custom request id generator.
    ///
    /// If the service was already bound, the latest binding wins for every method.
    pub fn bind_with_ids(service: Service, transport: T, ids: Arc<dyn IdGenerator>) -> Self {
        let transport = Arc::new(transport);
        let binding: Arc<dyn Invocable> = Arc::new(RpcInvoker::new(Arc::clone(&transport), ids));

        let methods = service.attach(&binding);

        info!(
            namespace = service.namespace(),
            methods,
            "Bound service to transport"
        );

        Self {
            service,
            transport,
            binding,
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls a method of the bound service by its short name.
    pub async fn call(&self, name: &str, params: Value) -> Result<Value, CallError> {
        self.service.call(name, params).await
    }

    /// Typed wrapper over [`Client::call`].
    pub async fn call_as<P, R>(&self, name: &str, params: &P) -> Result<R, CallError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let method = self
            .service
            .method(name)
            .ok_or_else(|| CallError::MethodNotFound(name.to_string()))?;
        method.call_as(params).await
    }
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            transport: Arc::clone(&self.transport),
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<T: Debug> Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service)
            .field("transport", &self.transport)
            .finish()
    }
}
