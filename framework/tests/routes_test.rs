use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use courier::jobs::{Broker, MemoryQueue, QueueProvider, RedisQueue};
use courier::routes::{router, Context};
use courier::LogSink;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    _dir: TempDir,
    queue: MemoryQueue,
    sink: LogSink,
    app: Router,
}

fn harness_with(queue: MemoryQueue) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let sink = LogSink::new(dir.path().join("messaging_system.log"));
    let app = router(Context {
        queue: Broker::Memory(queue.clone()),
        sink: sink.clone(),
    });
    Harness {
        _dir: dir,
        queue,
        sink,
        app,
    }
}

fn harness() -> Harness {
    harness_with(MemoryQueue::new())
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

async fn get(app: &Router, uri: &str) -> Reply {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

#[tokio::test]
async fn no_params_is_a_no_op() {
    let h = harness();

    let reply = get(&h.app, "/").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "No action specified.");
    assert!(h.queue.is_empty().await);
    assert!(!h.sink.path().exists());
}

#[tokio::test]
async fn unknown_params_are_ignored() {
    let h = harness();

    let reply = get(&h.app, "/?other=1").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "No action specified.");
}

#[tokio::test]
async fn sendmail_queues_one_job() {
    let h = harness();

    let reply = get(&h.app, "/?sendmail=user@example.com").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "Email sending task queued for user@example.com");
    assert_eq!(h.queue.len().await, 1);

    let entry = h.queue.claim_next().await.unwrap().unwrap();
    assert_eq!(entry.job_type, "courier::send_email");
    assert_eq!(entry.payload["to"], "user@example.com");
}

#[tokio::test]
async fn sendmail_value_is_url_decoded() {
    let h = harness();

    let reply = get(&h.app, "/?sendmail=user%40example.com").await;

    assert_eq!(reply.body, "Email sending task queued for user@example.com");
}

#[tokio::test]
async fn sendmail_takes_precedence_over_talktome() {
    let h = harness();

    let reply = get(&h.app, "/?talktome=1&sendmail=user@example.com").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "Email sending task queued for user@example.com");
    assert_eq!(h.queue.len().await, 1);
    // No time entry was written.
    assert!(!h.sink.path().exists());
}

#[tokio::test]
async fn empty_sendmail_falls_through_to_talktome() {
    let h = harness();

    let reply = get(&h.app, "/?sendmail=&talktome=yes").await;

    assert_eq!(reply.body, "Current time logged.");
    assert!(h.queue.is_empty().await);
}

#[tokio::test]
async fn each_talktome_appends_one_entry() {
    let h = harness();

    for _ in 0..3 {
        let reply = get(&h.app, "/?talktome=1").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, "Current time logged.");
    }

    let contents = h.sink.read_all().await.unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.contains(" INFO Current time logged: ")));
}

#[tokio::test]
async fn full_queue_returns_500_and_logs_failure() {
    let h = harness_with(MemoryQueue::bounded(0));

    let reply = get(&h.app, "/?sendmail=x@y.com").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "Failed to queue email sending task.");

    let contents = h.sink.read_all().await.unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains(" ERROR Failed to queue email sending task for x@y.com. Error: queue is full"));
}

#[tokio::test]
async fn unreachable_broker_returns_500() {
    let dir = tempfile::tempdir().unwrap();
    let sink = LogSink::new(dir.path().join("messaging_system.log"));
    // Nothing listens on port 1.
    let queue = RedisQueue::new("redis://127.0.0.1:1/", "default", Duration::from_millis(200)).unwrap();
    let app = router(Context {
        queue: Broker::Redis(queue),
        sink: sink.clone(),
    });

    let reply = get(&app, "/?sendmail=x@y.com").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "Failed to queue email sending task.");
    let contents = sink.read_all().await.unwrap();
    assert!(contents.contains("Failed to queue email sending task for x@y.com. Error: broker error"));
}

#[tokio::test]
async fn logs_serves_file_as_plain_text() {
    let h = harness();
    h.sink.info("Email sent to user@example.com").await.unwrap();

    let reply = get(&h.app, "/logs").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert_eq!(reply.body, h.sink.read_all().await.unwrap());
    assert!(reply.body.contains(" INFO Email sent to user@example.com"));
}

#[tokio::test]
async fn reading_logs_twice_is_identical() {
    let h = harness();
    get(&h.app, "/?talktome=1").await;

    let first = get(&h.app, "/logs").await;
    let second = get(&h.app, "/logs").await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn missing_log_file_returns_500_with_io_error() {
    let h = harness();
    h.sink.info("about to vanish").await.unwrap();
    std::fs::remove_file(h.sink.path()).unwrap();

    let reply = get(&h.app, "/logs").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.body.starts_with("Failed to read log file. Error: "));
    assert!(reply.body.contains("No such file or directory"));
}
