//! Periodic refresh of the services domain.

use crate::DomainStore;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Whether a poller currently has an active schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Polling,
}

/// Re-fetches the services domain of a [`DomainStore`] on a fixed interval.
///
/// [`start`](Self::start) fetches immediately and then once per interval;
/// [`stop`](Self::stop) cancels the schedule so that no fetch begins after
/// it returns. A fetch already running when `stop` is called completes.
/// Both are idempotent, and at most one schedule is ever active. Dropping
/// the poller stops it.
///
/// Updates reach consumers through [`DomainStore::subscribe_services`].
///
/// # Example
///
/// ```rust,no_run
/// use devscope::{DomainStore, ServicePoller, SystemInventory};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let store = Arc::new(DomainStore::new(Arc::new(SystemInventory::default())));
///     let mut updates = store.subscribe_services();
///     let poller = ServicePoller::new(store.clone(), Duration::from_millis(5000));
///     poller.start();
///     while updates.changed().await.is_ok() {
///         println!("{} services", updates.borrow().len());
///     }
/// }
/// ```
pub struct ServicePoller {
    store: Arc<DomainStore>,
    interval: Duration,
    schedule: Mutex<Option<CancellationToken>>,
}

impl ServicePoller {
    pub fn new(store: Arc<DomainStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            schedule: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PollerState {
        if self.is_polling() {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    pub fn is_polling(&self) -> bool {
        self.schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Move to [`PollerState::Polling`]. Returns `false` if already polling,
    /// or if called outside a Tokio runtime (the poller then stays idle).
    pub fn start(&self) -> bool {
        let mut schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);
        if schedule.is_some() {
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("service poller needs a Tokio runtime; not started");
            return false;
        };

        let token = CancellationToken::new();
        *schedule = Some(token.clone());
        let store = Arc::clone(&self.store);
        let period = self.interval;

        runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(interval = ?period, "service poller started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                store.load_services().await;
            }

            debug!("service poller stopped");
        });
        true
    }

    /// Move to [`PollerState::Idle`]. Returns `false` if already idle.
    pub fn stop(&self) -> bool {
        let token = self
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// One-shot fetch. Does not change the polling state.
    pub async fn refresh(&self) {
        self.store.load_services().await;
    }
}

impl Drop for ServicePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
