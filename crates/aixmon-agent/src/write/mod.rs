//! Remote write pipeline: pending queue, request encoding, HTTP delivery and
//! the loops that tie them together.

pub mod client;
pub mod codec;
pub mod queue;
pub mod remote;

pub use client::Client;
pub use queue::PendingQueue;
pub use remote::{Credentials, RemoteWriter, TickOutcome};
