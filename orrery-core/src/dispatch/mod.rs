mod commands;
mod engine_thread;
pub mod queue;
mod stats;

pub use commands::Task;
pub use queue::{TaskDispatchQueue, TaskSubmitter};
pub use stats::QueueStatsSnapshot;
