//! Consumer stream and settlement failures.
//!
//! The end of the delivery stream or an error on it stops the loop with an
//! error. A refused ack or nack is counted and the loop carries on.

use super::harness::{join_within, shutdown_pair, MockDelivery, MockQueue, ScriptedBackend};
use crate::error::{RelayError, RelayResult};
use crate::forwarder::Forwarder;
use futures_util::stream;
use std::time::Duration;

#[tokio::test]
async fn test_stream_end_is_consumer_closed() {
    let queue = MockQueue::new();
    queue.publish(b"one".to_vec());
    queue.publish(b"two".to_vec());
    let forwarder = Forwarder::new(ScriptedBackend::accepting(), Duration::from_millis(10));
    let (_tx, shutdown) = shutdown_pair();

    let result = forwarder.run(queue.draining_stream(), shutdown).await;

    assert!(matches!(result, Err(RelayError::ConsumerClosed)));
    assert_eq!(queue.settlement_count(), 2);
    assert!(queue.settlements().iter().all(|s| s.is_ack()));
}

#[tokio::test]
async fn test_stream_error_is_returned() {
    let forwarder = Forwarder::new(ScriptedBackend::accepting(), Duration::from_millis(10));
    let (_tx, shutdown) = shutdown_pair();
    let deliveries = stream::iter(vec![RelayResult::<MockDelivery>::Err(RelayError::Amqp {
        operation: "basic.consume",
        source: lapin::Error::InvalidChannel(1),
    })]);

    let result = forwarder.run(deliveries, shutdown).await;

    assert!(matches!(
        result,
        Err(RelayError::Amqp {
            operation: "basic.consume",
            ..
        })
    ));
}

#[tokio::test]
async fn test_refused_ack_is_counted_and_loop_continues() {
    let queue = MockQueue::new();
    queue.publish(b"one".to_vec());
    queue.publish(b"two".to_vec());
    queue.reject_settlements();
    let backend = ScriptedBackend::accepting();
    let forwarder = Forwarder::new(backend.clone(), Duration::from_millis(10));
    let (tx, shutdown) = shutdown_pair();

    let run = forwarder.run(queue.endless_stream(), shutdown);
    let trigger = async {
        while backend.received_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(()).unwrap();
    };
    let (stats, ()) = join_within(run, trigger).await;

    let stats = stats.unwrap();
    assert_eq!(stats.settle_errors, 2);
    assert_eq!(stats.acknowledged, 0);
    assert_eq!(queue.settlement_count(), 0);
}

#[tokio::test]
async fn test_refused_nack_is_reported_by_process_one() {
    let queue = MockQueue::new();
    queue.publish(b"{}".to_vec());
    queue.reject_settlements();
    let forwarder = Forwarder::new(ScriptedBackend::failing(500), Duration::from_millis(1));
    let (_tx, mut shutdown) = shutdown_pair();

    let delivery = queue.next_delivery().unwrap();
    let result = forwarder.process_one(delivery, &mut shutdown).await;

    assert!(matches!(
        result,
        Err(RelayError::Amqp {
            operation: "basic.nack",
            ..
        })
    ));
}
