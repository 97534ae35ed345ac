//! Integration tests for the ingestion server over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tailrelay::config::FolderSpec;
use tailrelay::server::{AppState, IngestServer, ServerError};
use tailrelay::sink::RelayEvent;
use tailrelay::watcher::{LogWatcher, WatcherError};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    feed: broadcast::Sender<RelayEvent>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();

        let (feed, _) = broadcast::channel(64);
        let cancel = CancellationToken::new();
        let server = IngestServer::new(AppState::new(feed.clone()), cancel.clone());
        let handle = tokio::spawn(server.serve(listener));

        Self {
            addr,
            feed,
            cancel,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        let result = timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Server should shut down within timeout")
            .expect("Server task panicked");
        assert!(result.is_ok());
    }
}

/// Read SSE chunks until one contains `needle`.
async fn read_sse_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut received = String::new();
    let found = timeout(Duration::from_secs(5), async {
        while let Some(chunk) = response.chunk().await.expect("SSE stream failed") {
            received.push_str(&String::from_utf8_lossy(&chunk));
            if received.contains(needle) {
                return true;
            }
        }
        false
    })
    .await;
    assert!(
        matches!(found, Ok(true)),
        "Did not see {needle:?} in SSE stream: {received}"
    );
    received
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));

    server.shutdown().await;
}

#[tokio::test]
async fn test_post_data_relays_payload() {
    let server = TestServer::start().await;
    let mut rx = server.feed.subscribe();

    let client = reqwest::Client::new();
    let response = client
        .post(server.url("/data"))
        .header("content-type", "application/json")
        .body(r#"{"user":"ana","items":[1,2,3]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Data received successfully");

    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Payload should be relayed")
        .unwrap();
    assert_eq!(
        event,
        RelayEvent::Payload(r#"{"user":"ana","items":[1,2,3]}"#.to_string())
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_post_data_rejects_invalid_json() {
    let server = TestServer::start().await;
    let mut rx = server.feed.subscribe();

    let response = reqwest::Client::new()
        .post(server.url("/data"))
        .body("{\"unterminated\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Invalid JSON format");
    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn test_data_requires_post() {
    let server = TestServer::start().await;

    let response = reqwest::get(server.url("/data")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    server.shutdown().await;
}

#[tokio::test]
async fn test_events_stream_carries_payloads() {
    let server = TestServer::start().await;

    let mut stream = reqwest::get(server.url("/events")).await.unwrap();
    assert_eq!(stream.status(), reqwest::StatusCode::OK);

    reqwest::Client::new()
        .post(server.url("/data"))
        .body(r#"{"step":1}"#)
        .send()
        .await
        .unwrap();

    let received = read_sse_until(&mut stream, "event: newData").await;
    assert!(received.contains("step"));

    drop(stream);
    server.shutdown().await;
}

#[tokio::test]
async fn test_events_stream_carries_log_lines() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap();
    let log = root.join("service.log");
    std::fs::write(&log, "").unwrap();

    let server = TestServer::start().await;
    let watcher = LogWatcher::new(Arc::new(server.feed.clone()));
    match watcher
        .start(vec![FolderSpec::new(&root).with_extensions(["*.log"])])
        .await
    {
        Ok(()) => {}
        Err(WatcherError::Notify(e)) => {
            eprintln!("Skipping test due to system limit: {e}");
            server.shutdown().await;
            return;
        }
        Err(e) => panic!("Unexpected error: {e}"),
    }

    let mut stream = reqwest::get(server.url("/events")).await.unwrap();

    std::fs::write(&log, "[ERROR] request failed\n").unwrap();

    let received = read_sse_until(&mut stream, "request failed").await;
    assert!(received.contains("event: logLine"));
    assert!(received.contains("\"level\":\"error\""));

    drop(stream);
    watcher.stop().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_stops_accepting_after_shutdown() {
    let server = TestServer::start().await;
    let addr = server.addr;

    assert!(tokio::net::TcpStream::connect(addr).await.is_ok());
    server.shutdown().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
