//! Periodically replace the displayed count with the aggregator's total.
//!
//! Polling is a convenience. A failed fetch leaves whatever is on screen alone and is only logged.

use std::{cell::Cell, rc::Rc, time::Duration};

use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};

use crate::{remote::Aggregator, surface::Surface};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct CountRefresher<A: Aggregator> {
    aggregator: Rc<A>,
    surface: Rc<Surface>,
    stopped: Rc<Cell<bool>>,
}

impl<A: Aggregator> CountRefresher<A> {
    pub fn new(aggregator: Rc<A>, surface: Rc<Surface>) -> Self {
        Self {
            aggregator,
            surface,
            stopped: Rc::new(Cell::new(false)),
        }
    }

    /// Fetch once and apply the result. Returns the count that was applied, if any.
    pub async fn tick(&self) -> Option<u64> {
        match self.aggregator.fetch_count().await {
            Ok(count) if self.stopped.get() => {
                log::debug!("Discarding RSVP count {count} that arrived after teardown");
                None
            }
            Ok(count) => {
                self.surface.set_count(count);
                Some(count)
            }
            Err(e) => {
                log::warn!("Error fetching RSVP count: {e}");
                None
            }
        }
    }
}

impl<A: Aggregator + 'static> CountRefresher<A> {
    /// Start polling on the local task set. The first tick fires immediately.
    ///
    /// Polling stops when the returned handle is stopped or dropped. A zero period falls back to
    /// [`DEFAULT_POLL_INTERVAL`].
    pub fn start(self, period: Duration) -> RefresherHandle {
        let period = if period.is_zero() {
            log::warn!("RSVP poll interval must be positive, using {DEFAULT_POLL_INTERVAL:?}");
            DEFAULT_POLL_INTERVAL
        } else {
            period
        };
        let stopped = self.stopped.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {}
                }
                self.tick().await;
                if self.stopped.get() {
                    break;
                }
            }
            log::debug!("RSVP count refresher stopped");
        });

        RefresherHandle {
            stopped,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

pub struct RefresherHandle {
    stopped: Rc<Cell<bool>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Stop polling. A fetch already in flight is left to finish, but its result is dropped.
    pub fn stop(self) {
        drop(self);
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("RSVP count refresher task failed: {e}");
            }
        }
    }

    fn teardown(&mut self) {
        self.stopped.set(true);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
