//! Handle to an outstanding request.
//!
//! Every handler call that registers a callback returns a [`Request`]. The
//! request owns the teardown for that registration (remove the callback,
//! stop a periodic data request, unsubscribe an event) and runs it exactly
//! once: on [`cancel`](Request::cancel) or when dropped. Teardowns only hold
//! weak references, so dropping a request after its handler or connection
//! is gone does nothing.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use simconnect_sdk::Request;
//!
//! let stops = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&stops);
//! let request = Request::new(7, move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! assert_eq!(request.id(), 7);
//! drop(request);
//! assert_eq!(stops.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;

use simconnect_models::NO_ID;

type Teardown = Box<dyn FnOnce() + Send>;

/// Move-only token for an outstanding request.
#[must_use = "dropping a Request cancels it"]
#[derive(Default)]
pub struct Request {
    id: u32,
    teardown: Option<Teardown>,
}

impl Request {
    /// A request with a teardown.
    pub fn new(id: u32, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A request with nothing to tear down, e.g. a one-shot request that
    /// cleans up after itself.
    pub fn without_teardown(id: u32) -> Self {
        Self { id, teardown: None }
    }

    /// A request that does nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The correlation id, or 0 for an empty request.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// True for an empty request.
    pub fn is_empty(&self) -> bool {
        self.id == NO_ID && self.teardown.is_none()
    }

    /// True while the teardown has not run.
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Run the teardown now.
    pub fn cancel(mut self) {
        self.run_teardown();
    }

    /// Forget the teardown: the registration stays in place for the rest of
    /// the session.
    pub fn detach(mut self) -> u32 {
        self.teardown = None;
        self.id
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
