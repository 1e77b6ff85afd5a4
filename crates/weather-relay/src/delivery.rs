//! Inbound messages and their delivery handles.
//!
//! A [`Delivery`] is resolved by value: `ack` and `nack_requeue` consume the
//! handle, so a message cannot be settled twice.

use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use lapin::options::{BasicAckOptions, BasicNackOptions};

/// A message received from the queue, together with its delivery handle.
#[async_trait]
pub trait Delivery: Send + Sized + 'static {
    /// Broker-assigned tag, unique per channel.
    fn delivery_tag(&self) -> u64;

    /// Opaque message body.
    fn body(&self) -> &[u8];

    /// Whether the broker delivered this message before.
    fn redelivered(&self) -> bool;

    /// Acknowledge this single message.
    async fn ack(self) -> RelayResult<()>;

    /// Reject this single message and ask the broker to requeue it.
    async fn nack_requeue(self) -> RelayResult<()>;
}

/// Delivery received through a lapin consumer.
#[derive(Debug)]
pub struct AmqpDelivery(lapin::message::Delivery);

impl From<lapin::message::Delivery> for AmqpDelivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        Self(delivery)
    }
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn delivery_tag(&self) -> u64 {
        self.0.delivery_tag
    }

    fn body(&self) -> &[u8] {
        &self.0.data
    }

    fn redelivered(&self) -> bool {
        self.0.redelivered
    }

    async fn ack(self) -> RelayResult<()> {
        self.0
            .acker
            .ack(BasicAckOptions { multiple: false })
            .await
            .map_err(|source| RelayError::Amqp {
                operation: "basic.ack",
                source,
            })
    }

    async fn nack_requeue(self) -> RelayResult<()> {
        self.0
            .acker
            .nack(BasicNackOptions {
                multiple: false,
                requeue: true,
            })
            .await
            .map_err(|source| RelayError::Amqp {
                operation: "basic.nack",
                source,
            })
    }
}
