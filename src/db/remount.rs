//! Remount coordination for the live database handle
//!
//! Consumers that find the live handle unusable call
//! [`RemountCoordinator::request_remount`]. The hosting environment owns the
//! receiving end of the request channel (see [`super::spawn_remount_worker`]),
//! tears the handle down, opens a new one and answers with
//! [`RemountCoordinator::notify_ready`], which releases every waiter at once
//! through a `watch` channel.
//!
//! Requests inside the debounce window never reach the handler twice: a
//! caller arriving while a remount is in flight joins the existing waiters,
//! and one arriving just after completion gets the last outcome back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::settings::RecoverySettings;

/// Timing knobs of the remount protocol
#[derive(Debug, Clone, Copy)]
pub struct RemountTimings {
    /// Window in which repeated requests collapse into one
    pub debounce: Duration,
    /// Upper bound on waiting for readiness
    pub timeout: Duration,
    /// Delay between readiness and releasing waiters
    pub stabilization: Duration,
}

impl Default for RemountTimings {
    fn default() -> Self {
        Self::from(&RecoverySettings::default())
    }
}

impl From<&RecoverySettings> for RemountTimings {
    fn from(settings: &RecoverySettings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            timeout: Duration::from_millis(settings.remount_timeout_ms),
            stabilization: Duration::from_millis(settings.stabilization_ms),
        }
    }
}

/// A request delivered to the registered remount handler
#[derive(Debug, Clone, Copy)]
pub struct RemountRequest {
    /// Sequence number of the request, starting at 1
    pub id: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ReadySignal {
    generation: u64,
    ok: bool,
}

#[derive(Debug, Default)]
struct RemountState {
    last_requested: Option<Instant>,
    in_flight: bool,
    last_outcome: bool,
}

enum Admission {
    Invoke,
    Join,
    Debounced(bool),
}

/// Process-wide remount coordination context
///
/// Created once by the process root and shared by `Arc` with the live handle,
/// the retry layer and the orchestrators.
#[derive(Debug)]
pub struct RemountCoordinator {
    handler: Mutex<Option<mpsc::UnboundedSender<RemountRequest>>>,
    state: Mutex<RemountState>,
    ready: watch::Sender<ReadySignal>,
    handle_open: AtomicBool,
    invocations: AtomicU64,
    timings: RemountTimings,
}

impl RemountCoordinator {
    pub fn new(timings: RemountTimings) -> Self {
        let (ready, _) = watch::channel(ReadySignal::default());
        Self {
            handler: Mutex::new(None),
            state: Mutex::new(RemountState::default()),
            ready,
            handle_open: AtomicBool::new(false),
            invocations: AtomicU64::new(0),
            timings,
        }
    }

    pub fn timings(&self) -> RemountTimings {
        self.timings
    }

    /// Install the remount handler, replacing any previous one
    ///
    /// The returned receiver yields one [`RemountRequest`] per handler
    /// invocation. The previous handler's channel is closed.
    pub fn register_handler(&self) -> mpsc::UnboundedReceiver<RemountRequest> {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = match self.handler.lock() {
            Ok(mut slot) => slot.replace(tx),
            Err(poisoned) => poisoned.into_inner().replace(tx),
        };
        if previous.is_some() {
            debug!("remount handler replaced");
        }
        rx
    }

    /// Ask the hosting environment to recreate the live handle
    ///
    /// Resolves to `true` once a new handle announces readiness, or `false`
    /// on failure, timeout, or when no handler is registered.
    pub async fn request_remount(&self) -> bool {
        let mut ready = self.ready.subscribe();
        let start_generation = ready.borrow_and_update().generation;

        match self.admit() {
            Admission::Debounced(outcome) => {
                debug!(outcome, "remount request debounced; returning last outcome");
                return outcome;
            }
            Admission::Join => {
                debug!("remount already in flight; joining waiters");
            }
            Admission::Invoke => {
                let sender = self.handler.lock().ok().and_then(|slot| slot.clone());
                let Some(sender) = sender else {
                    warn!("remount requested but no handler is registered");
                    self.finish(false);
                    return false;
                };
                let id = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
                if sender.send(RemountRequest { id }).is_err() {
                    warn!(request = id, "remount handler is gone");
                    self.finish(false);
                    return false;
                }
                info!(request = id, "requested live handle remount");
            }
        }

        let wait = ready.wait_for(|signal| signal.generation > start_generation);
        let outcome = match tokio::time::timeout(self.timings.timeout, wait).await {
            Ok(Ok(signal)) => Some(signal.ok),
            Ok(Err(_)) => Some(false),
            Err(_) => None,
        };
        match outcome {
            Some(ok) => ok,
            None => {
                warn!(
                    timeout_ms = self.timings.timeout.as_millis() as u64,
                    "timed out waiting for remounted handle"
                );
                self.finish(false);
                false
            }
        }
    }

    fn admit(&self) -> Admission {
        let now = Instant::now();
        let Ok(mut state) = self.state.lock() else {
            return Admission::Debounced(false);
        };
        if let Some(last) = state.last_requested {
            if now.duration_since(last) < self.timings.debounce {
                return if state.in_flight {
                    Admission::Join
                } else {
                    Admission::Debounced(state.last_outcome)
                };
            }
        }
        state.last_requested = Some(now);
        state.in_flight = true;
        Admission::Invoke
    }

    fn finish(&self, ok: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.in_flight = false;
            state.last_outcome = ok;
        }
    }

    /// Announce that the recreated handle is initialised
    ///
    /// Waits the stabilization delay so OS file handles settle before an
    /// immediate retry touches the new handle, then releases all waiters.
    pub async fn notify_ready(&self, ok: bool) {
        tokio::time::sleep(self.timings.stabilization).await;
        self.finish(ok);
        self.ready.send_modify(|signal| {
            signal.generation += 1;
            signal.ok = ok;
        });
        debug!(ok, "remount waiters released");
    }

    /// Lifecycle hook: a live handle was opened
    pub fn handle_opened(&self) {
        self.handle_open.store(true, Ordering::SeqCst);
    }

    /// Lifecycle hook: the live handle was closed
    pub fn handle_closed(&self) {
        self.handle_open.store(false, Ordering::SeqCst);
    }

    /// Whether the live handle is currently open, per the lifecycle hooks
    pub fn is_handle_open(&self) -> bool {
        self.handle_open.load(Ordering::SeqCst)
    }

    /// Number of times the handler has been invoked
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for RemountCoordinator {
    fn default() -> Self {
        Self::new(RemountTimings::default())
    }
}
