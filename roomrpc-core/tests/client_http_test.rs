use echo_service::EchoServer;
use roomrpc_core::{CallError, Client, ErrorInfo, HttpTransport, HttpTransportConfig, Service};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup(namespace: &str) -> (EchoServer, Client<HttpTransport>) {
    init_tracing();

    let server = EchoServer::spawn()
        .await
        .expect("Failed to start echo server");

    let transport = HttpTransport::new(HttpTransportConfig::new(server.url()))
        .expect("Failed to build transport");

    let service = Service::with_namespace(namespace);
    for name in [
        "ping",
        "echo",
        "fail",
        "conflict",
        "empty",
        "blank",
        "garbage",
        "bad_request",
        "teapot",
        "slow",
        "unknown",
    ] {
        service.register(name).unwrap();
    }

    (server, Client::bind(service, transport))
}

#[tokio::test]
async fn test_ping_round_trip() {
    let (server, client) = setup("").await;

    let result = client.call("ping", json!({ "x": 1 })).await.unwrap();

    assert_eq!(result, json!("pong"));

    let request = server.requests()[0].json();
    assert_eq!(request["name"], "ping");
    assert_eq!(request["params"], json!({ "x": 1 }));
    assert_eq!(request["id"].as_str().map(str::len), Some(36));
}

#[tokio::test]
async fn test_namespaced_echo() {
    let (server, client) = setup("room.echo").await;
    let params = json!({ "nested": { "list": [1, 2, 3] }, "flag": true });

    let result = client.call("echo", params.clone()).await.unwrap();

    assert_eq!(result, params);
    assert_eq!(server.requests()[0].json()["name"], "room.echo.echo");
}

#[tokio::test]
async fn test_remote_errors_pass_through() {
    let (_server, client) = setup("").await;

    let err = client.call("fail", json!({})).await.unwrap_err();
    assert!(matches!(
        &err,
        CallError::Remote(value)
            if value == &json!({ "message": "Something went wrong", "type": "AppError" })
    ));

    let err = client.call("conflict", json!({})).await.unwrap_err();
    assert_eq!(err.info(), ErrorInfo::new("Conflict", "AppError"));

    let err = client.call("unknown", json!({})).await.unwrap_err();
    assert_eq!(err.info().kind, "MethodNotFound");
}

#[tokio::test]
async fn test_no_content_resolves_to_null() {
    let (_server, client) = setup("").await;

    assert_eq!(client.call("empty", json!({})).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_ok_with_empty_body_resolves_to_null() {
    let (server, client) = setup("room").await;

    assert_eq!(client.call("blank", json!({})).await.unwrap(), Value::Null);
    assert_eq!(server.requests()[0].json()["name"], "room.blank");
}

#[tokio::test]
async fn test_garbage_body_is_response_format_error() {
    let (_server, client) = setup("").await;

    let err = client.call("garbage", json!({})).await.unwrap_err();

    assert!(matches!(err, CallError::InvalidResponseFormat));
}

#[tokio::test]
async fn test_status_errors_are_transport_errors() {
    let (_server, client) = setup("").await;

    let err = client.call("bad_request", json!({})).await.unwrap_err();
    assert!(matches!(err, CallError::Transport(ref info) if info == &ErrorInfo::transport("Invalid request")));

    let err = client.call("teapot", json!({})).await.unwrap_err();
    assert!(matches!(err, CallError::Transport(ref info) if info == &ErrorInfo::transport("Invalid response")));
}

#[tokio::test]
async fn test_concurrent_calls_complete_independently() {
    let (server, client) = setup("").await;
    let finished = Arc::new(Mutex::new(Vec::new()));

    let call = |tag: &'static str, ms: u64| {
        let client = client.clone();
        let finished = Arc::clone(&finished);
        async move {
            let result = client.call("slow", json!({ "ms": ms, "tag": tag })).await;
            finished.lock().unwrap().push(tag);
            result
        }
    };

    let (slow, fast) = tokio::join!(call("slow", 400), call("fast", 10));

    assert_eq!(slow.unwrap()["tag"], "slow");
    assert_eq!(fast.unwrap()["tag"], "fast");
    assert_eq!(*finished.lock().unwrap(), ["fast", "slow"]);

    let ids: Vec<Value> = server
        .requests()
        .iter()
        .map(|r| r.json()["id"].clone())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}
