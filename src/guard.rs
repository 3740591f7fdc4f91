//! Scroll-reset guard.
//!
//! Host frameworks scroll to the top after every navigation. While a
//! restoration is in flight that reset would undo the restored offset, so
//! the guard sits in front of the viewport's scroll-to primitive and drops
//! origin requests while it is armed. Non-origin requests always pass.
//!
//! Armed state is a window on the clock, not a flag: once the window's
//! hard deadline passes the guard is disarmed whether or not anyone
//! remembers to disarm it.

use crate::services::time_source::SharedTimeSource;
use crate::viewport::{ScrollRequest, ScrollTarget};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct GuardWindow {
    /// End of the current armed period
    until: Instant,
    /// Nothing may extend the window past this
    hard_deadline: Instant,
}

#[derive(Debug)]
pub struct ScrollGuard {
    window: Mutex<Option<GuardWindow>>,
    time: SharedTimeSource,
}

impl ScrollGuard {
    pub fn new(time: SharedTimeSource) -> Self {
        Self {
            window: Mutex::new(None),
            time,
        }
    }

    /// Arm for at most `hard_cap` from now
    pub fn arm(&self, hard_cap: Duration) {
        let now = self.time.now();
        let deadline = now + hard_cap;
        *self.lock() = Some(GuardWindow {
            until: deadline,
            hard_deadline: deadline,
        });
        tracing::debug!("Scroll guard armed for {:?}", hard_cap);
    }

    /// Shorten the armed window to `grace` from now, never past the hard
    /// deadline. Does nothing when the guard is not armed.
    pub fn narrow_to(&self, grace: Duration) {
        let now = self.time.now();
        if let Some(window) = self.lock().as_mut() {
            window.until = (now + grace).min(window.hard_deadline);
        }
    }

    pub fn disarm(&self) {
        if self.lock().take().is_some() {
            tracing::debug!("Scroll guard disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        let now = self.time.now();
        let mut window = self.lock();
        let current = *window;
        match current {
            Some(w) if now < w.until => true,
            Some(w) => {
                if now >= w.hard_deadline {
                    tracing::debug!("Scroll guard hit its hard cap");
                }
                *window = None;
                false
            }
            None => false,
        }
    }

    /// Whether `request` must be dropped
    pub fn blocks(&self, request: &ScrollRequest) -> bool {
        request.is_origin() && self.is_armed()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<GuardWindow>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scroll target decorated with the reset guard.
///
/// The host framework and the restoration controller both scroll through
/// this wrapper, so the controller's own corrective calls pass while the
/// framework's reset-to-top is swallowed.
pub struct GuardedScrollTarget<T: ?Sized + ScrollTarget> {
    inner: Arc<T>,
    guard: Arc<ScrollGuard>,
}

impl<T: ?Sized + ScrollTarget> GuardedScrollTarget<T> {
    pub fn new(inner: Arc<T>, guard: Arc<ScrollGuard>) -> Self {
        Self { inner, guard }
    }
}

impl<T: ?Sized + ScrollTarget> Clone for GuardedScrollTarget<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<T: ?Sized + ScrollTarget> ScrollTarget for GuardedScrollTarget<T> {
    fn scroll_to(&self, request: ScrollRequest) {
        if self.guard.blocks(&request) {
            tracing::debug!("Swallowed scroll-to-origin while restoring: {:?}", request);
            return;
        }
        self.inner.scroll_to(request);
    }
}
