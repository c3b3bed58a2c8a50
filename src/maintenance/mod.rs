//! Periodic re-resolution of the stored link set.
//!
//! - [`MaintenanceEngine`] - One run: list, shuffle, batch, retry, write back
//! - [`RetryPolicy`] - Fixed-delay attempt bound per link
//! - [`Scheduler`] - Triggers the engine on an interval

mod engine;
mod retry;
mod scheduler;

pub use engine::{
    DEFAULT_BATCH_COOLDOWN, DEFAULT_BATCH_SIZE, EngineError, MaintenanceEngine,
    MaintenanceSettings, RunStats,
};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryDecision, RetryExhausted, RetryPolicy,
    resolve_with_retry,
};
pub use scheduler::{DEFAULT_SCHEDULE_INTERVAL, Scheduler};
