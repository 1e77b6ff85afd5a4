//! Live broker session: connection, channel and the declared queue.

use crate::config::RelayConfig;
use crate::connector::connect_with_retry;
use crate::delivery::AmqpDelivery;
use crate::error::{RelayError, RelayResult};
use futures_util::{Stream, StreamExt};
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, error, info};

/// Reply code sent when closing the channel and connection.
const REPLY_SUCCESS: u16 = 200;

/// Unacked deliveries the broker may push to the consumer at once.
pub const PREFETCH_COUNT: u16 = 1;

/// Durable queue declaration used by both consumer and publisher.
pub fn durable_queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: false,
        durable: true,
        exclusive: false,
        auto_delete: false,
        nowait: false,
    }
}

/// Prefetch limit applied to this consumer only, not the whole channel.
pub fn consumer_qos_options() -> BasicQosOptions {
    BasicQosOptions { global: false }
}

/// Manual-ack, non-exclusive consumer registration.
pub fn manual_ack_consume_options() -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: false,
        no_ack: false,
        exclusive: false,
        nowait: false,
    }
}

/// Connection and channel bound to one durable queue.
pub struct BrokerSession {
    connection: Connection,
    channel: Channel,
    queue: String,
}

impl BrokerSession {
    /// Connect to the broker with retry, open a channel and declare the queue.
    ///
    /// Any failure after the connection is established is fatal; a session
    /// without a channel or queue cannot forward anything.
    pub async fn connect(config: &RelayConfig) -> RelayResult<Self> {
        let target = config.broker.amqp_target();

        info!(
            broker = %config.broker.redacted_uri(),
            max_attempts = config.connect_retry.max_attempts(),
            "Connecting to broker"
        );

        let connection = connect_with_retry(&config.connect_retry, move |_| {
            Connection::connect_uri(target.clone(), ConnectionProperties::default())
        })
        .await
        .map_err(|source| RelayError::Connection {
            attempts: config.connect_retry.max_attempts(),
            source,
        })?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|source| RelayError::QueueSetup {
                operation: "channel.open",
                source,
            })?;

        let session = Self {
            connection,
            channel,
            queue: config.queue_name.clone(),
        };
        session.declare_queue().await?;

        Ok(session)
    }

    /// Declare the durable queue. Idempotent when it already exists with
    /// the same properties.
    async fn declare_queue(&self) -> RelayResult<()> {
        let queue = self
            .channel
            .queue_declare(&self.queue, durable_queue_options(), FieldTable::default())
            .await
            .map_err(|source| RelayError::QueueSetup {
                operation: "queue.declare",
                source,
            })?;

        info!(
            queue = %self.queue,
            messages = queue.message_count(),
            consumers = queue.consumer_count(),
            "Declared durable queue"
        );

        Ok(())
    }

    /// Name of the declared queue.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Limit prefetch to one, register a manual-ack consumer and return its
    /// deliveries.
    ///
    /// The stream is infinite while the channel is open; it yields an error
    /// or ends once the broker closes the channel.
    pub async fn consume(
        &self,
    ) -> RelayResult<impl Stream<Item = RelayResult<AmqpDelivery>> + Send + 'static> {
        // One unacked delivery at a time; the backlog stays on the broker.
        self.channel
            .basic_qos(PREFETCH_COUNT, consumer_qos_options())
            .await
            .map_err(|source| RelayError::QueueSetup {
                operation: "basic.qos",
                source,
            })?;

        let consumer = self
            .channel
            .basic_consume(
                &self.queue,
                "",
                manual_ack_consume_options(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| RelayError::QueueSetup {
                operation: "basic.consume",
                source,
            })?;

        info!(
            queue = %self.queue,
            consumer_tag = %consumer.tag(),
            prefetch = PREFETCH_COUNT,
            "Registered consumer"
        );

        Ok(consumer.map(|item| {
            item.map(AmqpDelivery::from)
                .map_err(|source| RelayError::Amqp {
                    operation: "basic.deliver",
                    source,
                })
        }))
    }

    /// Put the channel into confirm mode so [`publish`](Self::publish) waits
    /// for the broker's ack.
    pub async fn enable_publisher_confirms(&self) -> RelayResult<()> {
        self.channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|source| RelayError::QueueSetup {
                operation: "confirm.select",
                source,
            })
    }

    /// Publish a persistent JSON message to the queue via the default exchange.
    pub async fn publish(&self, body: &[u8]) -> RelayResult<()> {
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2);

        let confirmation = self
            .channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|source| RelayError::Amqp {
                operation: "basic.publish",
                source,
            })?
            .await
            .map_err(|source| RelayError::Amqp {
                operation: "basic.publish",
                source,
            })?;

        if confirmation.is_nack() {
            return Err(RelayError::PublishRejected);
        }

        debug!(queue = %self.queue, payload_len = body.len(), "Published message");
        Ok(())
    }

    /// Close the channel and the connection, logging failures.
    pub async fn close(self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "relay shutting down").await {
            error!(error = %e, "Failed to close channel");
        }
        if let Err(e) = self
            .connection
            .close(REPLY_SUCCESS, "relay shutting down")
            .await
        {
            error!(error = %e, "Failed to close broker connection");
        }
        info!(queue = %self.queue, "Broker session closed");
    }
}
