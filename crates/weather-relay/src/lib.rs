//! Weather relay: forwards weather readings from a durable AMQP queue to an
//! HTTP backend.
//!
//! Each message body is POSTed verbatim. The broker is acked only after the
//! backend accepted the body; anything else is requeued after a fixed delay.
//!
//! # Core Invariants
//!
//! 1. **Content-Agnostic**: bodies are never parsed or modified
//! 2. **Settle Once**: every delivery is acked or nacked exactly once
//! 3. **One In-Flight**: messages are forwarded strictly one at a time
//! 4. **Crash-Safe**: an unsettled message is redelivered by the broker
//!
//! # Architecture
//!
//! ```text
//! weather_data queue -> Forwarder -> POST BACKEND_URL
//!        ^                  |
//!        |__ ack / nack ____|
//! ```

pub mod backend;
pub mod config;
pub mod connector;
pub mod delivery;
pub mod error;
pub mod forwarder;
pub mod sample;
pub mod session;
pub mod shutdown;

#[cfg(test)]
mod tests;

pub use backend::{Backend, HttpBackend};
pub use config::{BrokerConfig, RelayConfig};
pub use connector::{connect_with_retry, Backoff, RetryPolicy};
pub use delivery::{AmqpDelivery, Delivery};
pub use error::{RelayError, RelayResult};
pub use forwarder::{ForwardStats, Forwarder, Outcome};
pub use sample::WeatherReading;
pub use session::BrokerSession;
pub use shutdown::{shutdown_signal, Shutdown};
