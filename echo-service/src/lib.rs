//! # Echo Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide an HTTP RPC endpoint for
//! integration testing `roomrpc-core`. It is not intended for production use.
//!
//! The server answers `POST /rpc` according to the last segment of the request's method name,
//! so `ping` and `some.namespace.ping` behave the same:
//!
//! | Method | Response |
//! |--------|----------|
//! | `ping` | `200 {"result": "pong"}` |
//! | `echo` | `200 {"result": <params>}` |
//! | `fail` | `200 {"error": {"message": "Something went wrong", "type": "AppError"}}` |
//! | `conflict` | `200` with both `result` and `error` |
//! | `empty` | `204` |
//! | `blank` | `200` with an empty body |
//! | `garbage` | `200` with a body that is not JSON |
//! | `set_cookie` | `200 {"result": "ok"}` and `Set-Cookie: session=abc123; Path=/` |
//! | `bad_request` | `400` |
//! | `teapot` | `418` |
//! | `slow` | waits `params.ms` milliseconds, then echoes params |
//! | anything else | `200 {"error": {"message": "Method not found", "type": "MethodNotFound"}}` |
//!
//! A body that is not JSON is answered with `400`. Every request is recorded.
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{net::TcpListener, sync::oneshot};

/// A request as received by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    /// The body parsed as JSON, `Value::Null` when it is not valid JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// The cookie set by the `set_cookie` method.
pub const SESSION_COOKIE: &str = "session=abc123; Path=/";

type Requests = Arc<Mutex<Vec<RecordedRequest>>>;

/// A running echo server. Shuts down when dropped.
pub struct EchoServer {
    addr: SocketAddr,
    requests: Requests,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl EchoServer {
    /// Starts a server on a random local port.
    pub async fn spawn() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let requests = Requests::default();
        let app = Router::new()
            .route("/rpc", post(handle))
            .with_state(Arc::clone(&requests));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// The RPC endpoint, e.g. `http://127.0.0.1:41234/rpc`.
    pub fn url(&self) -> String {
        format!("http://{}/rpc", self.addr)
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(State(requests): State<Requests>, headers: HeaderMap, body: String) -> Response {
    requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedRequest {
            headers,
            body: body.clone(),
        });

    let Ok(request) = serde_json::from_str::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let name = request["name"].as_str().unwrap_or_default();
    let params = request["params"].clone();

    match name.rsplit('.').next().unwrap_or_default() {
        "ping" => ok(json!({ "result": "pong" })),
        "echo" => ok(json!({ "result": params })),
        "fail" => ok(json!({
            "error": { "message": "Something went wrong", "type": "AppError" }
        })),
        "conflict" => ok(json!({
            "result": "ignored",
            "error": { "message": "Conflict", "type": "AppError" }
        })),
        "empty" => StatusCode::NO_CONTENT.into_response(),
        "blank" => StatusCode::OK.into_response(),
        "garbage" => (StatusCode::OK, "this is not json").into_response(),
        "set_cookie" => (
            [(SET_COOKIE, SESSION_COOKIE)],
            ok(json!({ "result": "ok" })),
        )
            .into_response(),
        "bad_request" => StatusCode::BAD_REQUEST.into_response(),
        "teapot" => StatusCode::IM_A_TEAPOT.into_response(),
        "slow" => {
            let ms = params["ms"].as_u64().unwrap_or(100);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ok(json!({ "result": params }))
        }
        _ => ok(json!({
            "error": { "message": "Method not found", "type": "MethodNotFound" }
        })),
    }
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, body.to_string()).into_response()
}
