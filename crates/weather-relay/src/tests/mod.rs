//! Forwarder behaviour tests.
//!
//! - `harness.rs`  - In-memory queue, delivery handles and a scripted backend
//! - `ack.rs`      - Acknowledgement after a successful POST
//! - `requeue.rs`  - Delay then nack-with-requeue on failure
//! - `ordering.rs` - One message in flight, queue order preserved
//! - `shutdown.rs` - Signal-driven stop, including mid-delay
//! - `consumer.rs` - Consumer stream errors and settle failures
//! - `content.rs`  - Opaque bodies, end to end over HTTP

mod consumer;
mod requeue;
