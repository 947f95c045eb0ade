//! End-to-end dispatch loop scenarios on a paused clock.
//!
//! The delivery seam is replaced with a recording sink so the tests observe
//! exactly what would have gone over the wire, and when.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pubsub_broadcaster::config::Config;
use pubsub_broadcaster::message_file;
use pubsub_broadcaster::outbound::{
    BroadcastRequest, BroadcastSink, DeliveryError, DeliveryReceipt, Dispatcher, Envelope,
    MessageQueue, TokenIssuer,
};
use serde_json::json;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct SeenRequest {
    request: BroadcastRequest,
    at: Instant,
}

/// Records every delivery; optionally fails the first `fail_first` of them
/// with a transport error.
struct RecordingSink {
    seen: Mutex<Vec<SeenRequest>>,
    fail_first: AtomicUsize,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(0),
        })
    }

    fn failing_first(count: usize) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(count),
        })
    }

    fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn messages(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| {
                let envelope: Envelope =
                    serde_json::from_str(&s.request.body).expect("body is an envelope");
                envelope.message
            })
            .collect()
    }

    fn instants(&self) -> Vec<Instant> {
        self.seen.lock().unwrap().iter().map(|s| s.at).collect()
    }

    fn requests(&self) -> Vec<BroadcastRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.request.clone())
            .collect()
    }
}

#[async_trait]
impl BroadcastSink for RecordingSink {
    async fn deliver(&self, request: BroadcastRequest) -> Result<DeliveryReceipt, DeliveryError> {
        self.seen.lock().unwrap().push(SeenRequest {
            request,
            at: Instant::now(),
        });

        let remaining = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(DeliveryError::Network("connection reset".to_string()));
        }

        Ok(DeliveryReceipt {
            status: 204,
            headers: vec![("date".to_string(), "now".to_string())],
            body: String::new(),
        })
    }
}

fn test_config(repeat: bool) -> Config {
    Config {
        interval: 1000,
        file: PathBuf::from("messages.json"),
        verbose: false,
        repeat,
        channel: "173220974".to_string(),
        owner: "173220974".to_string(),
        extension: "client-abc".to_string(),
        secret: BASE64.encode(b"sekrit-signing-key"),
    }
}

fn dispatcher(
    items: Vec<serde_json::Value>,
    config: &Config,
    sink: Arc<RecordingSink>,
) -> Dispatcher<RecordingSink> {
    let queue = MessageQueue::new(items, config.repeat);
    let issuer = TokenIssuer::from_config(config).expect("issuer");
    Dispatcher::new(queue, issuer, sink, config)
}

// ---------------------------------------------------------------------------
// Scenario: non-cyclic two-item queue
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn two_messages_send_one_second_apart_then_stop() {
    let config = test_config(false);
    let sink = RecordingSink::new();
    let start = Instant::now();

    let summary = dispatcher(vec![json!({"a": 1}), json!({"b": 2})], &config, sink.clone())
        .run()
        .await;
    tokio::task::yield_now().await;

    assert_eq!(summary.attempted, 2);
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.messages(), vec![r#"{"a":1}"#, r#"{"b":2}"#]);

    // First send after one full period, second exactly one period later.
    let instants = sink.instants();
    assert_eq!(instants[0] - start, Duration::from_secs(1));
    assert_eq!(instants[1] - instants[0], Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn requests_carry_the_wire_contract_fields() {
    let config = test_config(false);
    let sink = RecordingSink::new();

    dispatcher(vec![json!({"a": 1})], &config, sink.clone())
        .run()
        .await;
    tokio::task::yield_now().await;

    let requests = sink.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].channel_id, "173220974");
    assert_eq!(requests[0].client_id, "client-abc");
    assert!(!requests[0].token.is_empty());

    let envelope: Envelope = serde_json::from_str(&requests[0].body).expect("envelope body");
    assert_eq!(envelope.content_type, "application/json");
    assert_eq!(envelope.targets, vec!["broadcast".to_string()]);
}

// ---------------------------------------------------------------------------
// Scenario: cyclic queue
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cyclic_queue_keeps_sending_in_original_order() {
    let config = test_config(true);
    let sink = RecordingSink::new();

    let handle = tokio::spawn(
        dispatcher(vec![json!({"a": 1}), json!({"b": 2})], &config, sink.clone()).run(),
    );

    // Five full periods plus slack: ticks at 1s..=5s have fired.
    tokio::time::sleep(Duration::from_millis(5500)).await;
    handle.abort();

    assert_eq!(sink.len(), 5);
    assert_eq!(
        sink.messages(),
        vec![
            r#"{"a":1}"#,
            r#"{"b":2}"#,
            r#"{"a":1}"#,
            r#"{"b":2}"#,
            r#"{"a":1}"#,
        ]
    );

    let instants = sink.instants();
    for pair in instants.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
    }
}

// ---------------------------------------------------------------------------
// Scenario: empty input
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn empty_queue_completes_without_sending() {
    let config = test_config(false);
    let sink = RecordingSink::new();

    let summary = dispatcher(vec![], &config, sink.clone()).run().await;

    assert_eq!(summary.attempted, 0);
    assert_eq!(sink.len(), 0);
}

// ---------------------------------------------------------------------------
// Scenario: one failed send does not halt the loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_first_send_does_not_stop_later_sends() {
    let config = test_config(false);
    let sink = RecordingSink::failing_first(1);

    let summary = dispatcher(
        vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
        &config,
        sink.clone(),
    )
    .run()
    .await;
    tokio::task::yield_now().await;

    // All three deliveries were attempted on schedule despite the failure.
    assert_eq!(summary.attempted, 3);
    assert_eq!(sink.len(), 3);
    assert_eq!(
        sink.messages(),
        vec![r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#]
    );
}

// ---------------------------------------------------------------------------
// Scenario: falsy payloads are messages, not terminators
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn null_and_zero_payloads_are_dispatched() {
    let config = test_config(false);
    let sink = RecordingSink::new();

    let summary = dispatcher(
        vec![json!(null), json!(0), json!({"tail": true})],
        &config,
        sink.clone(),
    )
    .run()
    .await;
    tokio::task::yield_now().await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(sink.messages(), vec!["null", "0", r#"{"tail":true}"#]);
}

// ---------------------------------------------------------------------------
// Scenario: malformed input fails before any timer starts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_message_file_aborts_startup() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"this is not json").expect("write fixture");

    let result = message_file::load_messages(file.path()).await;
    assert!(result.is_err());
}
