//! The command queue and fan-out executor (§4.3): a typed command enum, a
//! single-worker FIFO queue, and the optimistic-publish / fan-out / ack-wait
//! / settle / mesh-refresh lifecycle.

mod command;
mod error;
mod executor;
mod publisher;
mod queue;

pub use command::*;
pub use error::*;
pub use executor::*;
pub use publisher::*;
pub use queue::*;
