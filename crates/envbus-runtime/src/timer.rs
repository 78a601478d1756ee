//! Cancellable timers.
//!
//! A `CancellableTimer` owns the task behind a repeating or one-shot timer.
//! `cancel` aborts it and releases the handle; calling it again, or on a timer
//! that already fired, does nothing. Dropping the timer cancels it.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use envbus_core::error::{BusError, Result};

#[derive(Debug)]
pub struct CancellableTimer {
    handle: Option<JoinHandle<()>>,
}

impl CancellableTimer {
    /// Run `tick` every `period`, first after one full period. A zero period
    /// is refused.
    pub fn every<F, Fut>(name: &'static str, period: Duration, tick: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(BusError::BadRequest(format!("timer {name}: period must be non-zero")));
        }
        let rt = runtime(name)?;
        let handle = rt.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Run `fire` once after `delay`.
    pub fn after<F, Fut>(name: &'static str, delay: Duration, fire: F) -> Result<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let rt = runtime(name)?;
        let handle = rt.spawn(async move {
            time::sleep(delay).await;
            fire().await;
        });
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Abort the timer. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Let go of the handle without aborting. Used by a one-shot timer's own
    /// callback, which must not abort the task it is running on.
    pub fn release(&mut self) {
        self.handle = None;
    }
}

impl Drop for CancellableTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn runtime(name: &'static str) -> Result<Handle> {
    Handle::try_current()
        .map_err(|_| BusError::Internal(format!("timer {name} needs a tokio runtime")))
}
