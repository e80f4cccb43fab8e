//! Order status polling as a cancellable task.
//!
//! [`OrderStatusPoller::start`] fetches the order immediately and then on
//! every interval tick until a terminal status is applied. Fetches run
//! concurrently and are tagged with an issue sequence number; a response is
//! applied only if no later-issued fetch has been applied already, so a slow
//! early request never overwrites a newer status.
//!
//! Dropping or cancelling the [`PollHandle`] stops the timer, aborts
//! in-flight fetches and detaches the state channel, so nothing is published
//! after teardown.

use log::{debug, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use crate::client::{ApiError, OrderApi};
use crate::domain::{Order, OrderId};
use crate::logging::{log_poll_error, log_terminal};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Shorter intervals, including zero, are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Nothing has resolved yet.
    Loading,
    Loaded(Order),
    NotFound,
    Error(String),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Loaded(order) if order.status.is_terminal())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Clamped to at least [`MIN_POLL_INTERVAL`].
    pub interval: Duration,
    /// Consecutive fetch errors tolerated before polling stops. Zero stops
    /// on the first error.
    pub error_retries: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            error_retries: 0,
        }
    }
}

type Publisher = Arc<Mutex<Option<watch::Sender<PollState>>>>;

pub struct OrderStatusPoller;

impl OrderStatusPoller {
    /// Each call starts from scratch, even for an id that already reached a
    /// terminal status under an earlier handle.
    pub fn start(api: Arc<dyn OrderApi>, order_id: OrderId, config: PollerConfig) -> PollHandle {
        let (tx, rx) = watch::channel(PollState::Loading);
        let publisher: Publisher = Arc::new(Mutex::new(Some(tx)));

        let task = tokio::spawn(drive(api, order_id, config, publisher.clone()));

        PollHandle {
            order_id,
            updates: rx,
            publisher,
            task,
        }
    }
}

pub struct PollHandle {
    order_id: OrderId,
    updates: watch::Receiver<PollState>,
    publisher: Publisher,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Latest applied state.
    pub fn state(&self) -> PollState {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.updates.clone()
    }

    /// Waits for the next applied state. `None` once polling has stopped
    /// (terminal status, exhausted error budget or cancellation) and the
    /// final state has been observed.
    pub async fn next_state(&mut self) -> Option<PollState> {
        self.updates.changed().await.ok()?;
        Some(self.updates.borrow_and_update().clone())
    }

    /// True once the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the timer and suppresses every pending response.
    pub fn cancel(&self) {
        detach(&self.publisher);
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn detach(publisher: &Publisher) {
    if let Ok(mut slot) = publisher.lock() {
        slot.take();
    }
}

/// Returns false when the handle has been cancelled.
fn publish(publisher: &Publisher, state: PollState) -> bool {
    match publisher.lock() {
        Ok(slot) => match slot.as_ref() {
            Some(tx) => {
                tx.send_replace(state);
                true
            }
            None => false,
        },
        Err(_) => false,
    }
}

async fn drive(
    api: Arc<dyn OrderApi>,
    order_id: OrderId,
    config: PollerConfig,
    publisher: Publisher,
) {
    let mut ticker = interval(config.interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: JoinSet<(u64, Result<Option<Order>, ApiError>)> = JoinSet::new();
    let mut next_seq: u64 = 0;
    let mut last_applied: Option<u64> = None;
    let mut consecutive_errors: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let seq = next_seq;
                next_seq += 1;
                debug!("fetching order {} (#{})", order_id, seq);

                let api = api.clone();
                in_flight.spawn(async move { (seq, api.get_order(order_id).await) });
            }
            Some(joined) = in_flight.join_next() => {
                let (seq, result) = match joined {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        debug!("status fetch task ended abnormally: {}", e);
                        continue;
                    }
                };

                if last_applied.is_some_and(|applied| seq < applied) {
                    debug!("discarding stale response #{} for order {}", seq, order_id);
                    continue;
                }
                last_applied = Some(seq);

                let (state, stop) = match result {
                    Ok(Some(order)) => {
                        consecutive_errors = 0;
                        let terminal = order.status.is_terminal();
                        if terminal {
                            log_terminal(order_id, order.status);
                        }
                        (PollState::Loaded(order), terminal)
                    }
                    Ok(None) => {
                        consecutive_errors = 0;
                        (PollState::NotFound, false)
                    }
                    Err(e) => {
                        consecutive_errors = consecutive_errors.saturating_add(1);
                        let message = e.to_string();
                        log_poll_error(order_id, consecutive_errors, &message);
                        (PollState::Error(message), consecutive_errors > config.error_retries)
                    }
                };

                if !publish(&publisher, state) || stop {
                    break;
                }
            }
        }
    }

    // closing the channel tells watchers that polling has ended
    in_flight.abort_all();
    detach(&publisher);
    info!("status polling for order {} finished", order_id);
}
