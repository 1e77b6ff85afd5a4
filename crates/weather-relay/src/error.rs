//! Error types for the weather relay.

use thiserror::Error;

/// Relay error type.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Broker unreachable after exhausting the connection retries
    #[error("Could not connect to broker after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: lapin::Error,
    },

    /// Channel, queue or consumer setup failed on a live connection
    #[error("Queue setup failed during {operation}: {source}")]
    QueueSetup {
        operation: &'static str,
        #[source]
        source: lapin::Error,
    },

    /// AMQP operation failed on an established channel
    #[error("AMQP {operation} failed: {source}")]
    Amqp {
        operation: &'static str,
        #[source]
        source: lapin::Error,
    },

    /// The broker did not confirm a published message
    #[error("Broker rejected published message")]
    PublishRejected,

    /// The consumer stream ended; the channel or connection is gone
    #[error("Consumer stream closed by broker")]
    ConsumerClosed,

    /// Backend could not be reached (DNS, refused connection, timeout)
    #[error("Transport error reaching backend: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a status other than 200 or 201
    #[error("Backend returned status: {status}")]
    Backend { status: u16 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (logging setup, stdin)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The forwarder task panicked or was aborted
    #[error("Forwarder task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RelayError {
    /// Whether this error is a per-message backend failure that leads to a
    /// requeue rather than stopping the process.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Backend { .. })
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
