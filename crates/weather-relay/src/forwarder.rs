//! Consume-forward-settle loop.

use crate::backend::Backend;
use crate::delivery::Delivery;
use crate::error::{RelayError, RelayResult};
use crate::shutdown::Shutdown;
use futures_util::{Stream, StreamExt};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a single message was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Backend accepted the body; the message was acked.
    Acknowledged,
    /// Backend rejected the body or was unreachable; the message was
    /// nacked with requeue.
    Requeued,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    pub acknowledged: u64,
    pub requeued: u64,
    /// Acks or nacks the broker did not accept.
    pub settle_errors: u64,
}

/// The weather relay forwarder.
///
/// Takes one message at a time from the queue, POSTs it to the backend and
/// settles it: ack on success, fixed delay then nack-with-requeue on
/// failure. Nothing about the payload is inspected.
pub struct Forwarder<B> {
    backend: B,
    failure_delay: Duration,
}

impl<B: Backend> Forwarder<B> {
    pub fn new(backend: B, failure_delay: Duration) -> Self {
        Self {
            backend,
            failure_delay,
        }
    }

    /// Run until `shutdown` fires or the delivery stream breaks.
    ///
    /// Per-message failures never end the loop. A stream error or the end of
    /// the stream means the channel is gone and is returned as an error.
    pub async fn run<S, D>(
        &self,
        deliveries: S,
        mut shutdown: Shutdown,
    ) -> RelayResult<ForwardStats>
    where
        S: Stream<Item = RelayResult<D>>,
        D: Delivery,
    {
        let mut deliveries = std::pin::pin!(deliveries);
        let mut stats = ForwardStats::default();

        info!(
            failure_delay_ms = self.failure_delay.as_millis() as u64,
            "Starting forwarder loop"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                next = deliveries.next() => Some(next),
            };

            let delivery = match next {
                None => {
                    info!(
                        acknowledged = stats.acknowledged,
                        requeued = stats.requeued,
                        settle_errors = stats.settle_errors,
                        "Forwarder loop stopped"
                    );
                    return Ok(stats);
                }
                Some(Some(Ok(delivery))) => delivery,
                Some(Some(Err(e))) => {
                    error!(error = %e, "Consumer stream failed");
                    return Err(e);
                }
                Some(None) => {
                    error!("Consumer stream ended");
                    return Err(RelayError::ConsumerClosed);
                }
            };

            match self.process_one(delivery, &mut shutdown).await {
                Ok(Outcome::Acknowledged) => stats.acknowledged += 1,
                Ok(Outcome::Requeued) => stats.requeued += 1,
                Err(_) => stats.settle_errors += 1,
            }

            if shutdown.is_triggered() {
                info!(
                    acknowledged = stats.acknowledged,
                    requeued = stats.requeued,
                    settle_errors = stats.settle_errors,
                    "Forwarder loop stopped"
                );
                return Ok(stats);
            }
        }
    }

    /// Forward one message and settle it exactly once.
    ///
    /// Any backend error requeues the message. Errors other than transport
    /// failures and rejected statuses are logged at `error`.
    ///
    /// Returns an error only when the broker refused the ack or nack; the
    /// outcome decision itself never fails.
    pub async fn process_one<D: Delivery>(
        &self,
        delivery: D,
        shutdown: &mut Shutdown,
    ) -> RelayResult<Outcome> {
        let delivery_tag = delivery.delivery_tag();

        info!(
            delivery_tag,
            payload_len = delivery.body().len(),
            redelivered = delivery.redelivered(),
            "Received message"
        );
        debug!(
            delivery_tag,
            body = %String::from_utf8_lossy(delivery.body()),
            "Message body"
        );

        let posted = self.backend.post(delivery.body()).await;
        match posted {
            Ok(()) => {
                info!(delivery_tag, "Posted message to backend");
                delivery.ack().await.map_err(|e| {
                    error!(delivery_tag, error = %e, "Failed to acknowledge message");
                    e
                })?;
                Ok(Outcome::Acknowledged)
            }
            Err(e) => {
                let delay_ms = self.failure_delay.as_millis() as u64;
                if e.is_delivery_failure() {
                    warn!(
                        delivery_tag,
                        error = %e,
                        delay_ms,
                        "Failed to post to backend, requeueing after delay"
                    );
                } else {
                    error!(
                        delivery_tag,
                        error = %e,
                        delay_ms,
                        "Unexpected backend error, requeueing after delay"
                    );
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.failure_delay) => {}
                    _ = shutdown.recv() => {
                        debug!(delivery_tag, "Shutdown during failure delay, requeueing now");
                    }
                }

                delivery.nack_requeue().await.map_err(|e| {
                    error!(delivery_tag, error = %e, "Failed to requeue message");
                    e
                })?;
                Ok(Outcome::Requeued)
            }
        }
    }
}
