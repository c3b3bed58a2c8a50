//! Periodic trigger for the maintenance engine.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::MaintenanceEngine;

/// Default time between scheduled runs.
pub const DEFAULT_SCHEDULE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Fires [`MaintenanceEngine::trigger`] on a fixed cadence.
///
/// Ticks that land while a run is still active are ignored by the engine's
/// run guard, so slow runs never stack up.
#[derive(Debug)]
pub struct Scheduler {
    engine: MaintenanceEngine,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler; an interval under one second is raised to one second.
    #[must_use]
    pub fn new(engine: MaintenanceEngine, interval: Duration) -> Self {
        Self {
            engine,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Returns the tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the tick loop. The first run happens one interval from now.
    ///
    /// Abort the returned handle to stop scheduling; a run already in flight
    /// keeps going in its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if self.engine.trigger().is_some() {
                    debug!("scheduled maintenance run started");
                }
            }
        })
    }
}
