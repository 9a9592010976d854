//! # Transport Contract
//!
//! A [`Transport`] performs the actual request/response exchange of an RPC call. It is a
//! three step lifecycle wrapped around every single request:
//!
//! ```text
//! idle -> opening -> awaiting-response -> { success | failure } -> closing -> terminal
//! ```
//!
//! Implementors provide [`Transport::exchange`] and optionally [`Transport::open`] and
//! [`Transport::close`]. Callers use [`TransportExt::send`], which runs the whole lifecycle and
//! guarantees that `close` runs once `open` was attempted, whatever the outcome. `send` is
//! implemented once for every transport and cannot be overridden. Nothing is kept between two
//! sends: each call starts again from `idle`.
//!
//! Every failure is an [`ErrorInfo`]; the built-in transports tag them with
//! [`TRANSPORT_ERROR_TYPE`].
use crate::envelope::ErrorInfo;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{Instrument, debug_span, trace, warn};

pub mod http;

/// The `type` tag of failures raised by the transport layer.
pub const TRANSPORT_ERROR_TYPE: &str = "TransportError";

#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepares the transport for one exchange. No-op by default.
    async fn open(&self) -> Result<(), ErrorInfo> {
        Ok(())
    }

    /// Performs exactly one request/response exchange.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(body))` - The raw response body.
    /// * `Ok(None)` - The exchange succeeded with no content.
    /// * `Err(ErrorInfo)` - Any transport-level problem.
    async fn exchange(&self, payload: String) -> Result<Option<String>, ErrorInfo>;

    /// Releases whatever `open` acquired. No-op by default.
    async fn close(&self) -> Result<(), ErrorInfo> {
        Ok(())
    }
}

/// The caller side of a [`Transport`], implemented for every transport.
#[async_trait]
pub trait TransportExt: Transport {
    /// Runs `open`, `exchange` and `close` for a single request.
    ///
    /// `close` is always awaited, including when `open` or `exchange` failed. A failing
    /// `close` is logged and does not replace the outcome of the exchange.
    async fn send(&self, payload: String) -> Result<Option<String>, ErrorInfo>;
}

#[async_trait]
impl<T: Transport + ?Sized> TransportExt for T {
    async fn send(&self, payload: String) -> Result<Option<String>, ErrorInfo> {
        async move {
            trace!("opening");
            let outcome = match self.open().await {
                Ok(()) => {
                    trace!("awaiting response");
                    self.exchange(payload).await
                }
                Err(error) => Err(error),
            };

            trace!(success = outcome.is_ok(), "closing");
            if let Err(error) = self.close().await {
                warn!(%error, "Transport close failed");
            }

            outcome
        }
        .instrument(debug_span!("transport_send"))
        .await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn open(&self) -> Result<(), ErrorInfo> {
        (**self).open().await
    }

    async fn exchange(&self, payload: String) -> Result<Option<String>, ErrorInfo> {
        (**self).exchange(payload).await
    }

    async fn close(&self) -> Result<(), ErrorInfo> {
        (**self).close().await
    }
}
