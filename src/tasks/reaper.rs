//! Reaper Task
//!
//! Background task that periodically removes expired cache entries, so keys
//! nobody reads again still get reclaimed.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, WeakStore};
use crate::error::{CacheError, Result};

// == Reaper ==
/// State shared by every handle to one reaper task.
#[derive(Debug)]
pub(crate) struct ReaperShared {
    /// `Some(interval)` while running, `None` requests shutdown
    schedule: watch::Sender<Option<Duration>>,
    /// Taken by the first `stop`; later stoppers wait on the lock
    task: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// Handle to a store's reaper.
///
/// A store has at most one reaper: starting again while it runs returns a
/// handle to the same task. The reaper holds only a weak reference to its
/// store and only ever deletes expired entries. Once every handle is dropped
/// without calling [`stop`](Self::stop), the task exits at its next sweep
/// boundary.
#[derive(Debug)]
pub struct Reaper {
    shared: Arc<ReaperShared>,
}

impl Reaper {
    /// Spawns a reaper sweeping `store` every `interval`, or reschedules the
    /// one already running on `store`.
    ///
    /// The first sweep happens one full interval after start.
    ///
    /// # Errors
    /// - `CacheError::InvalidArgument` for a zero interval
    /// - `CacheError::NoRuntime` when called outside a tokio runtime
    ///
    /// # Example
    /// ```ignore
    /// let cache: CacheStore<String, String> = CacheStore::new();
    /// let mut reaper = Reaper::start(&cache, Duration::from_secs(1))?;
    /// // Later, during shutdown:
    /// reaper.stop().await?;
    /// ```
    pub fn start<K, V>(store: &CacheStore<K, V>, interval: Duration) -> Result<Self>
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        validate_interval(interval)?;

        let mut slot = store.reaper_slot();
        if let Some(shared) = slot.upgrade() {
            let existing = Self { shared };
            // Fails only if the task exited meanwhile; spawn a fresh one then
            if existing.reschedule(interval).is_ok() {
                return Ok(existing);
            }
        }

        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let (schedule, rx) = watch::channel(Some(interval));
        let task = runtime.spawn(run(store.downgrade(), rx));
        let shared = Arc::new(ReaperShared {
            schedule,
            task: Mutex::new(Some(task)),
        });
        *slot = Arc::downgrade(&shared);

        info!("Reaper started with interval of {:?}", interval);

        Ok(Self { shared })
    }

    /// Replaces the sweep interval of a running reaper.
    ///
    /// Starting an already-started reaper means rescheduling it; the new
    /// interval counts from the moment of this call.
    ///
    /// # Errors
    /// - `CacheError::InvalidArgument` for a zero interval
    /// - `CacheError::ReaperStopped` once the reaper has stopped
    pub fn reschedule(&self, interval: Duration) -> Result<()> {
        validate_interval(interval)?;

        // Errors once the task has dropped its receiver
        self.shared
            .schedule
            .send(Some(interval))
            .map_err(|_| CacheError::ReaperStopped)?;

        debug!("Reaper rescheduled to {:?}", interval);
        Ok(())
    }

    /// Returns true while the background task is alive.
    pub fn is_running(&self) -> bool {
        !self.shared.schedule.is_closed()
    }

    /// Stops the reaper and waits for it to finish.
    ///
    /// Stops the task behind every handle to it. A sweep already in progress
    /// completes before this returns. Calling `stop` on a stopped reaper is a
    /// no-op.
    ///
    /// # Errors
    /// The failure that ended the task early, if any: `StoreUnavailable` when
    /// the store was dropped, `Internal` when the task panicked.
    pub async fn stop(&mut self) -> Result<()> {
        let mut task = self.shared.task.lock().await;
        let Some(handle) = task.take() else {
            return Ok(());
        };

        // A send error only means the task already exited; the join says why.
        let _ = self.shared.schedule.send(None);

        let outcome = match handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                Err(CacheError::Internal("reaper task panicked".to_string()))
            }
            Err(err) => Err(CacheError::Internal(err.to_string())),
        };

        match &outcome {
            Ok(()) => info!("Reaper stopped"),
            Err(err) => warn!("Reaper stopped with error: {}", err),
        }

        outcome
    }
}

fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(CacheError::InvalidArgument(
            "reaper interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Sweep loop. Shutdown and reschedule requests are only observed between
/// sweeps, never in the middle of one.
async fn run<K, V>(
    store: WeakStore<K, V>,
    mut schedule: watch::Receiver<Option<Duration>>,
) -> Result<()>
where
    K: Eq + Hash,
{
    let Some(mut period) = *schedule.borrow_and_update() else {
        return Ok(());
    };
    let mut timer = ticker(period);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = schedule.changed() => {
                if changed.is_err() {
                    debug!("Reaper handle dropped, exiting");
                    return Ok(());
                }

                let requested = *schedule.borrow_and_update();
                match requested {
                    Some(next) => {
                        period = next;
                        timer = ticker(period);
                        continue;
                    }
                    None => return Ok(()),
                }
            }
        }

        let Some(store) = store.upgrade() else {
            warn!("Reaper cannot sweep: store has been dropped");
            return Err(CacheError::StoreUnavailable);
        };

        let removed = store.purge_expired();
        drop(store);

        if removed > 0 {
            info!("Reaper sweep: removed {} expired entries", removed);
        } else {
            debug!("Reaper sweep: no expired entries found (interval {:?})", period);
        }
    }
}
