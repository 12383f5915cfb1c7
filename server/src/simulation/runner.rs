//! The periodic tick task.
//!
//! Every tick reads the current race state, asks the [`TelemetrySource`]
//! for events and publishes them in order. The task owns the source, so
//! telemetry is only ever mutated from one place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::race_state::RaceStateManager;

use super::engine::TelemetrySource;

/// Handle to a running tick task.
pub struct SimulationHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SimulationHandle {
    /// Stop the task and wait for it to exit.
    ///
    /// Returns the number of ticks it ran. A tick in progress completes
    /// before the task observes the stop.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(ticks) => ticks,
            Err(e) => {
                tracing::error!("simulation task failed: {e}");
                0
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the tick task on the current tokio runtime.
///
/// The first tick fires one `period` after spawning. Ticks that fall behind
/// are skipped rather than bunched up.
pub fn spawn_simulation_task<S>(
    mut source: S,
    race_state: Arc<RaceStateManager>,
    period: Duration,
) -> SimulationHandle
where
    S: TelemetrySource + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let period = period.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        tracing::info!(?period, "simulation started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let race = race_state.get();
                    let broadcaster = race_state.broadcaster();
                    let events = source.tick(&race);
                    tracing::trace!(tick = ticks, events = events.len(), "tick");
                    for event in events {
                        broadcaster.publish(event);
                    }
                    ticks += 1;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(ticks, "simulation stopped");
        ticks
    });

    SimulationHandle { shutdown, task }
}
