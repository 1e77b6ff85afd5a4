//! Failure handling.
//!
//! Any non-success status or transport failure waits the failure delay,
//! then nacks the message with requeue. The loop keeps going.

use super::harness::{
    run_until_settled, shutdown_pair, BackendReply, MockQueue, ScriptedBackend, Settlement,
};
use crate::backend::{Backend, HttpBackend};
use crate::delivery::Delivery;
use crate::error::{RelayError, RelayResult};
use crate::forwarder::{Forwarder, Outcome};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Backend failing with an error that is not a delivery failure.
struct MisconfiguredBackend;

#[async_trait]
impl Backend for MisconfiguredBackend {
    async fn post(&self, _body: &[u8]) -> RelayResult<()> {
        Err(RelayError::Config("backend url missing".into()))
    }
}

#[tokio::test]
async fn test_server_error_nacks_with_requeue() {
    let queue = MockQueue::new();
    queue.publish(b"{\"city\":\"Lima\"}".to_vec());
    let forwarder = Forwarder::new(ScriptedBackend::failing(500), Duration::from_millis(10));
    let (_tx, mut shutdown) = shutdown_pair();

    let delivery = queue.next_delivery().unwrap();
    let outcome = forwarder
        .process_one(delivery, &mut shutdown)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    assert_eq!(
        queue.settlements(),
        vec![Settlement::Nack {
            delivery_tag: 1,
            body: b"{\"city\":\"Lima\"}".to_vec(),
            requeue: true,
        }]
    );

    let redelivery = queue.next_delivery().unwrap();
    assert!(redelivery.redelivered());
}

#[tokio::test]
async fn test_failure_waits_before_nack() {
    let queue = MockQueue::new();
    queue.publish(b"{}".to_vec());
    let delay = Duration::from_millis(150);
    let forwarder = Forwarder::new(ScriptedBackend::failing(503), delay);
    let (_tx, mut shutdown) = shutdown_pair();

    let started = Instant::now();
    let delivery = queue.next_delivery().unwrap();
    forwarder.process_one(delivery, &mut shutdown).await.unwrap();

    assert!(started.elapsed() >= delay);
    assert_eq!(queue.settlement_count(), 1);
}

#[tokio::test]
async fn test_every_other_status_requeues() {
    for status in [202, 204, 301, 400, 404, 429, 500, 502, 503] {
        let queue = MockQueue::new();
        queue.publish(b"{}".to_vec());
        let forwarder =
            Forwarder::new(ScriptedBackend::failing(status), Duration::from_millis(1));
        let (_tx, mut shutdown) = shutdown_pair();

        let delivery = queue.next_delivery().unwrap();
        let outcome = forwarder
            .process_one(delivery, &mut shutdown)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Requeued, "status {status}");
        assert_eq!(queue.ready_len(), 1, "status {status}");
    }
}

#[tokio::test]
async fn test_unreachable_backend_requeues() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let backend = HttpBackend::new(
        &format!("http://127.0.0.1:{port}/weather/logs"),
        Duration::from_secs(2),
    )
    .unwrap();
    let forwarder = Forwarder::new(backend, Duration::from_millis(10));
    let queue = MockQueue::new();
    queue.publish(b"{}".to_vec());
    let (_tx, mut shutdown) = shutdown_pair();

    let delivery = queue.next_delivery().unwrap();
    let outcome = forwarder
        .process_one(delivery, &mut shutdown)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    assert!(!queue.settlements()[0].is_ack());
}

#[tokio::test]
async fn test_unexpected_backend_error_still_requeues() {
    let queue = MockQueue::new();
    queue.publish(b"{}".to_vec());
    let forwarder = Forwarder::new(MisconfiguredBackend, Duration::from_millis(5));
    let (_tx, mut shutdown) = shutdown_pair();

    let delivery = queue.next_delivery().unwrap();
    let outcome = forwarder
        .process_one(delivery, &mut shutdown)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Requeued);
    assert_eq!(queue.ready_len(), 1);
    assert!(!RelayError::Config(String::new()).is_delivery_failure());
}

#[tokio::test]
async fn test_loop_continues_after_failure() {
    let queue = MockQueue::new();
    queue.publish(b"A".to_vec());
    queue.publish(b"B".to_vec());
    let backend = ScriptedBackend::accepting();
    backend.script(BackendReply::Status(500));
    let forwarder = Forwarder::new(backend, Duration::from_millis(10));

    let stats = run_until_settled(&forwarder, &queue, 3).await;

    let settlements = queue.settlements();
    assert_eq!(settlements.len(), 3);
    assert!(!settlements[0].is_ack());
    assert_eq!(settlements[0].body(), b"A");
    assert!(settlements[1].is_ack());
    assert_eq!(settlements[1].body(), b"A");
    assert!(settlements[2].is_ack());
    assert_eq!(settlements[2].body(), b"B");
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.acknowledged, 2);
}

#[tokio::test]
async fn test_rejected_message_is_retried_indefinitely() {
    let queue = MockQueue::new();
    queue.publish(b"poison".to_vec());
    let backend = ScriptedBackend::failing(400);
    let forwarder = Forwarder::new(backend.clone(), Duration::from_millis(1));

    let stats = run_until_settled(&forwarder, &queue, 5).await;

    assert!(stats.requeued >= 5);
    assert_eq!(stats.acknowledged, 0);
    assert!(queue
        .settlements()
        .iter()
        .all(|s| !s.is_ack() && s.body() == b"poison"));
    assert!(backend.received_count() >= 5);
}
