//! End-to-end tests of the HTTP surface over a real socket.
//!
//! Dependencies are mocks, so no database or cache is needed.

use std::sync::Arc;
use std::time::Duration;

use dependency_status::context::AppContext;
use dependency_status::dependency::MockDependency;
use dependency_status::retry::RetryPolicy;
use dependency_status::startup;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct TestServer {
    addr: std::net::SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<dependency_status::Result<()>>,
}

impl TestServer {
    async fn start(mongo: Arc<MockDependency>, redis: Arc<MockDependency>, policy: RetryPolicy) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = AppContext::new(mongo, redis, 4000);
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(startup::serve(listener, ctx, policy, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn get(&self, path: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        let status = raw
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap();
        let body = raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default();
        (status, body)
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let (status, body) = self.get(path).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        backoff_multiplier: 1.5,
    }
}

async fn wait_for_status(server: &TestServer, expected: u16) -> Value {
    for _ in 0..200 {
        let (status, body) = server.get_json("/health").await;
        if status == expected {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("/health never returned {}", expected);
}

#[tokio::test]
async fn becomes_healthy_after_document_store_retries() {
    let mongo = Arc::new(MockDependency::failing("MongoDB", 3));
    let redis = Arc::new(MockDependency::new("Redis"));
    let server = TestServer::start(mongo.clone(), redis.clone(), fast_policy(15)).await;

    let body = wait_for_status(&server, 200).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(mongo.attempts(), 4);
    assert_eq!(redis.attempts(), 1);

    server.stop().await;
}

#[tokio::test]
async fn stays_degraded_when_cache_connect_fails() {
    let mongo = Arc::new(MockDependency::new("MongoDB"));
    let redis = Arc::new(MockDependency::unreachable("Redis"));
    let server = TestServer::start(mongo.clone(), redis.clone(), fast_policy(15)).await;

    // Wait for the document store to come up, then confirm the cache stays down.
    for _ in 0..200 {
        let (_, status) = server.get_json("/api/status").await;
        if status["mongodb"] == "connected" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (code, body) = server.get_json("/health").await;
    assert_eq!(code, 503);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["mongodb"], "connected");
    assert_eq!(body["redis"], "disconnected");

    // No retry policy for the cache.
    assert_eq!(redis.attempts(), 1);

    server.stop().await;
}

#[tokio::test]
async fn exhausted_retries_leave_server_running_degraded() {
    let mongo = Arc::new(MockDependency::unreachable("MongoDB"));
    let redis = Arc::new(MockDependency::new("Redis"));
    let server = TestServer::start(mongo.clone(), redis.clone(), fast_policy(2)).await;

    for _ in 0..200 {
        if mongo.attempts() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(mongo.attempts(), 3);

    let (code, body) = server.get_json("/api/status").await;
    assert_eq!(code, 200);
    assert_eq!(body["app"], "Express Server");
    assert_eq!(body["mongodb"], "disconnected");
    assert_eq!(body["port"], 4000);

    let (code, _) = server.get_json("/health").await;
    assert_eq!(code, 503);

    server.stop().await;
}

#[tokio::test]
async fn greeting_is_served_before_dependencies_connect() {
    let mongo = Arc::new(MockDependency::unreachable("MongoDB"));
    let redis = Arc::new(MockDependency::unreachable("Redis"));
    let server = TestServer::start(mongo, redis, fast_policy(1)).await;

    let (code, body) = server.get("/").await;

    assert_eq!(code, 200);
    assert_eq!(body, "Welcome to Dockerhub, new change 111111111111!");

    server.stop().await;
}
