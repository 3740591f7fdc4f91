//! Navigation scroll context.
//!
//! The state that outlives any single screen: saved positions, the route
//! the scroll listener is attributing events to, and the reset guard. One
//! context is shared (via `Arc`) by the listener, the controller and any
//! screen that wants to read or contribute a position by hand. Tests build
//! one per case.

use crate::guard::ScrollGuard;
use crate::route::RouteId;
use crate::services::time_source::SharedTimeSource;
use crate::store::PositionStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Who the scroll listener is recording for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListeningTarget {
    /// Last scrollable route arrived at
    pub route: Option<RouteId>,
    /// Set while an overlay or non-scrolling route is on top; root scroll
    /// events in that state belong to nobody
    pub suspended: bool,
    /// Where the restoring scroll left the viewport. Scroll events that
    /// report this offset come from the engine, not the user.
    pub engine_offset: Option<f64>,
}

#[derive(Debug)]
pub struct ScrollContext {
    positions: PositionStore,
    listening: Mutex<ListeningTarget>,
    guard: Arc<ScrollGuard>,
}

pub type SharedScrollContext = Arc<ScrollContext>;

impl ScrollContext {
    pub fn new(time: SharedTimeSource) -> Self {
        Self {
            positions: PositionStore::new(time.clone()),
            listening: Mutex::new(ListeningTarget::default()),
            guard: Arc::new(ScrollGuard::new(time)),
        }
    }

    pub fn shared(time: SharedTimeSource) -> SharedScrollContext {
        Arc::new(Self::new(time))
    }

    /// Record a position by hand, e.g. before a full-screen sub-view that
    /// is not modeled as a route covers the page
    pub fn save_scroll_position(&self, route: &RouteId, offset: f64) -> bool {
        self.positions.save(route, offset)
    }

    /// Saved offset for `route`, 0 when none
    pub fn get_saved_scroll_position(&self, route: &RouteId) -> f64 {
        self.positions.load(route)
    }

    pub fn clear_scroll_position(&self, route: &RouteId) {
        if let Some(offset) = self.positions.forget(route) {
            tracing::debug!("Cleared saved offset {} for {}", offset, route);
        }
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn guard(&self) -> &Arc<ScrollGuard> {
        &self.guard
    }

    pub fn listening(&self) -> ListeningTarget {
        self.lock_listening().clone()
    }

    pub fn listening_route(&self) -> Option<RouteId> {
        self.lock_listening().route.clone()
    }

    /// Remember the offset the engine's own scroll produced, until the
    /// next user-driven change or arrival
    pub(crate) fn note_engine_scroll(&self, offset: f64) {
        self.lock_listening().engine_offset = Some(offset);
    }

    /// Only navigation handling writes the listening target
    pub(crate) fn update_listening<R>(&self, f: impl FnOnce(&mut ListeningTarget) -> R) -> R {
        f(&mut self.lock_listening())
    }

    fn lock_listening(&self) -> MutexGuard<'_, ListeningTarget> {
        self.listening.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
