//! Driving a [`Dispatcher`] from the calling thread.
//!
//! | Loop | Waits by |
//! |------|----------|
//! | [`SimpleLoop`] | not waiting: one drain per call |
//! | [`PollingLoop`] | sleeping a fixed step between drains |
//! | [`EventWaitLoop`] | blocking on the connection's [`Notification`](crate::transport::Notification) |
//!
//! Every loop stops at its deadline, when its predicate turns true, or
//! when the connection closes. Errors are logged, never returned.

use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::dispatch::Dispatcher;

const TARGET: &str = "simconnect::runloop";

/// Default sleep between polls.
pub const DEFAULT_POLL_STEP: Duration = Duration::from_millis(100);

/// Default longest single wait of an [`EventWaitLoop`].
pub const DEFAULT_WAIT_SLICE: Duration = Duration::from_millis(50);

/// Sleep used by an [`EventWaitLoop`] whose connection has no notification.
const FALLBACK_POLL: Duration = Duration::from_millis(10);

/// A way of running the dispatcher.
pub trait RunLoop {
    /// The dispatcher being driven.
    fn dispatcher(&self) -> &Dispatcher;

    /// Dispatch whatever is waiting and return how many messages ran.
    fn dispatch(&self) -> usize {
        self.dispatcher().drain_pending()
    }

    /// Dispatch for `duration`.
    fn dispatch_for(&self, duration: Duration);

    /// Dispatch until `predicate` returns true or the connection closes.
    fn dispatch_until(&self, predicate: impl FnMut() -> bool);

    /// Dispatch until `predicate` returns true, the connection closes, or
    /// `timeout` passes. Returns the last value of `predicate`.
    fn dispatch_until_or_timeout(&self, predicate: impl FnMut() -> bool, timeout: Duration) -> bool;
}

/// `None` when `duration` reaches past what an [`Instant`] can hold, which
/// then means no deadline at all.
fn deadline_after(duration: Duration) -> Option<Instant> {
    Instant::now().checked_add(duration)
}

/// Drain, test, wait, repeat.
fn drive(
    dispatcher: &Dispatcher,
    deadline: Option<Instant>,
    mut wait: impl FnMut(Duration),
    mut predicate: impl FnMut() -> bool,
) -> bool {
    loop {
        dispatcher.drain_pending();
        if predicate() {
            return true;
        }
        if !dispatcher.connection().is_open() {
            trace!(target: TARGET, "connection closed, leaving run loop");
            return false;
        }
        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                deadline - now
            }
            None => Duration::MAX,
        };
        wait(remaining);
    }
}

// ── SimpleLoop ───────────────────────────────────────────────────────────

/// Drains once per call and never waits. Durations are ignored.
#[derive(Debug, Clone)]
pub struct SimpleLoop {
    dispatcher: Dispatcher,
}

impl SimpleLoop {
    /// A loop over `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl RunLoop for SimpleLoop {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn dispatch_for(&self, _duration: Duration) {
        self.dispatch();
    }

    fn dispatch_until(&self, mut predicate: impl FnMut() -> bool) {
        self.dispatch();
        predicate();
    }

    fn dispatch_until_or_timeout(&self, mut predicate: impl FnMut() -> bool, _timeout: Duration) -> bool {
        self.dispatch();
        predicate()
    }
}

// ── PollingLoop ──────────────────────────────────────────────────────────

/// Alternates draining and sleeping.
#[derive(Debug, Clone)]
pub struct PollingLoop {
    dispatcher: Dispatcher,
    step: Duration,
}

impl PollingLoop {
    /// A loop over `dispatcher` sleeping [`DEFAULT_POLL_STEP`] between
    /// drains.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            step: DEFAULT_POLL_STEP,
        }
    }

    /// Sleep `step` between drains.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// The sleep between drains.
    pub fn step(&self) -> Duration {
        self.step
    }

    fn sleep(&self, remaining: Duration) {
        thread::sleep(remaining.min(self.step));
    }
}

impl RunLoop for PollingLoop {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn dispatch_for(&self, duration: Duration) {
        drive(&self.dispatcher, deadline_after(duration), |d| self.sleep(d), || false);
    }

    fn dispatch_until(&self, predicate: impl FnMut() -> bool) {
        drive(&self.dispatcher, None, |d| self.sleep(d), predicate);
    }

    fn dispatch_until_or_timeout(&self, predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
        drive(&self.dispatcher, deadline_after(timeout), |d| self.sleep(d), predicate)
    }
}

// ── EventWaitLoop ────────────────────────────────────────────────────────

/// Sleeps until the host signals that messages are waiting. Connections
/// opened without a notification are polled at a short interval instead.
#[derive(Debug, Clone)]
pub struct EventWaitLoop {
    dispatcher: Dispatcher,
    slice: Duration,
}

impl EventWaitLoop {
    /// A loop over `dispatcher` waiting at most [`DEFAULT_WAIT_SLICE`] at a
    /// time.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            slice: DEFAULT_WAIT_SLICE,
        }
    }

    /// Wait at most `slice` at a time, so predicates are re-checked at
    /// least that often.
    #[must_use]
    pub fn with_wait_slice(mut self, slice: Duration) -> Self {
        self.slice = slice;
        self
    }

    fn wait(&self, remaining: Duration) {
        let timeout = remaining.min(self.slice);
        match self.dispatcher.connection().notification() {
            Some(notification) => {
                notification.wait_timeout(timeout);
            }
            None => thread::sleep(timeout.min(FALLBACK_POLL)),
        }
    }
}

impl RunLoop for EventWaitLoop {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn dispatch_for(&self, duration: Duration) {
        drive(&self.dispatcher, deadline_after(duration), |d| self.wait(d), || false);
    }

    fn dispatch_until(&self, predicate: impl FnMut() -> bool) {
        drive(&self.dispatcher, None, |d| self.wait(d), predicate);
    }

    fn dispatch_until_or_timeout(&self, predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
        drive(&self.dispatcher, deadline_after(timeout), |d| self.wait(d), predicate)
    }
}
