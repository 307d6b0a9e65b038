use crate::{
    prelude::Future,
    runtime::{spawn, AsyncHandle},
    Error, Result,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A repeating task with a fixed period, cancelled on drop.
///
/// The first tick fires one full period after [`PollingTask::start`]. Each
/// tick's work is spawned on its own, so a slow tick never delays the next
/// one and cancelling the task leaves in-flight work to settle.
pub struct PollingTask {
    handle: Box<dyn AsyncHandle>,
    period: Duration,
    ticks: Arc<AtomicU64>,
}

impl PollingTask {
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }

        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();

        let handle = spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                log::debug!("poll tick #{}", n);
                // Detached; dropping the handle does not abort the tick
                let _ = spawn(tick());
            }
        });

        log::debug!("polling started every {:?}", period);
        Ok(Self {
            handle,
            period,
            ticks,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks fired so far
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn cancel(&self) {
        if self.is_active() {
            log::debug!("polling cancelled after {} ticks", self.tick_count());
        }
        self.handle.cancel();
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
