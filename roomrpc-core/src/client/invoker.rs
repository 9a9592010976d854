//! The invocation strategy installed on bound methods: one request envelope, one round trip.
use super::CallError;
use crate::{
    envelope::{RequestEnvelope, ResponseEnvelope},
    id::IdGenerator,
    service::Invocable,
    transport::{Transport, TransportExt},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct RpcInvoker<T> {
    transport: Arc<T>,
    ids: Arc<dyn IdGenerator>,
}

impl<T> RpcInvoker<T> {
    pub(crate) fn new(transport: Arc<T>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { transport, ids }
    }
}

#[async_trait]
impl<T> Invocable for RpcInvoker<T>
where
    T: Transport + 'static,
{
    async fn invoke(&self, name: &str, params: Value) -> Result<Value, CallError> {
        let request = RequestEnvelope::new(self.ids.generate_id(), name, params);
        let payload = request.encode().map_err(CallError::Serialize)?;

        debug!(id = %request.id, method = %request.name, "Sending RPC request");

        let body = self
            .transport
            .send(payload)
            .await
            .map_err(CallError::Transport)?;

        let outcome = match body.as_deref() {
            // No content is a successful call without a result.
            None | Some("") => Ok(Value::Null),
            Some(body) => decode_response(body),
        };

        debug!(
            id = %request.id,
            method = %request.name,
            success = outcome.is_ok(),
            "RPC call settled"
        );

        outcome
    }
}

fn decode_response(body: &str) -> Result<Value, CallError> {
    let envelope = ResponseEnvelope::decode(body).map_err(|_| CallError::InvalidResponseFormat)?;
    envelope.into_outcome().map_err(CallError::Remote)
}
