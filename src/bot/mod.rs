//! Chat side of the bot: command routing, outbound delivery, and the
//! bounded worker pool that drains webhook-ingested updates.

pub mod commands;
pub mod delivery;
pub mod dispatch;
pub mod router;

pub use commands::Command;
pub use delivery::BotDelivery;
pub use dispatch::{QUEUE_CAPACITY, QueueFull, WORKER_COUNT, WorkerPool};
pub use router::MessageRouter;
