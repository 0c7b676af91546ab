//! Unbounded, order-preserving queue with a non-blocking write side.
//!
//! - [`unbounded_queue`] - Spawns the relay task and returns both halves
//! - [`QueueSender`] - Clonable producer half, [`QueueSender::safe_feed`] never blocks
//! - [`QueueReceiver`] - Single consumer half, also a [`futures_core::Stream`]
//!
//! Every chunk maker is built from these queues: one in front of the core
//! loop, one behind it.

mod unbounded;

pub use unbounded::{QueueReceiver, QueueSender, unbounded_queue};
