//! The viewport seam.
//!
//! Everything that moves the root viewport goes through [`ScrollTarget`].
//! The restoration controller additionally needs to measure how far the
//! page can currently scroll ([`Viewport`]) and to subscribe to content
//! mutations while it waits for the page to grow ([`ContentWatcher`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// An imperative scroll-to request, in CSS pixels.
///
/// A missing coordinate means 0, matching the default-argument form of a
/// scroll-to call. `ScrollRequest::default()` is therefore "go to the top".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollRequest {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl ScrollRequest {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    /// Vertical-only request, horizontal stays at the origin
    pub fn to_y(y: f64) -> Self {
        Self::new(0.0, y)
    }

    pub fn target_y(&self) -> f64 {
        self.y.unwrap_or(0.0)
    }

    /// Whether this request sends the viewport back to the top
    pub fn is_origin(&self) -> bool {
        self.target_y() <= 0.0
    }
}

/// Anything that can be told to scroll the root viewport.
pub trait ScrollTarget: Send + Sync {
    /// Scroll immediately (no animation) to the requested position
    fn scroll_to(&self, request: ScrollRequest);
}

/// The root viewport: a scroll target whose geometry can be measured.
pub trait Viewport: ScrollTarget {
    /// Current vertical offset
    fn scroll_offset(&self) -> f64;

    /// Total height of the rendered document
    fn document_height(&self) -> f64;

    /// Height of the visible area
    fn viewport_height(&self) -> f64;

    /// Furthest offset the page can currently be scrolled to
    fn max_scroll_extent(&self) -> f64 {
        (self.document_height() - self.viewport_height()).max(0.0)
    }
}

/// Token for one active mutation subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// Subscription capability on the root content container.
///
/// While a handle is active the host forwards each mutation batch to the
/// engine. Hosts without mutation observation simply don't provide one.
pub trait ContentWatcher: Send + Sync {
    fn watch(&self) -> WatchHandle;

    fn unwatch(&self, handle: WatchHandle);
}

#[derive(Debug, Default)]
struct SimulatedPage {
    offset: f64,
    document_height: f64,
    viewport_height: f64,
    applied: Vec<ScrollRequest>,
    watches: HashSet<WatchHandle>,
    next_watch: u64,
}

impl SimulatedPage {
    fn max_extent(&self) -> f64 {
        (self.document_height - self.viewport_height).max(0.0)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.clamp(0.0, self.max_extent());
    }
}

/// In-memory viewport that behaves like a browser window.
///
/// Offsets are clamped to the scrollable extent, shrinking the document
/// pulls the offset back, and every scroll request that reaches it is
/// logged. Clones share the same page.
#[derive(Debug, Clone, Default)]
pub struct SimulatedViewport {
    page: Arc<Mutex<SimulatedPage>>,
}

impl SimulatedViewport {
    pub fn new(viewport_height: f64, document_height: f64) -> Self {
        let page = SimulatedPage {
            viewport_height,
            document_height,
            ..Default::default()
        };
        Self {
            page: Arc::new(Mutex::new(page)),
        }
    }

    fn with_page<R>(&self, f: impl FnOnce(&mut SimulatedPage) -> R) -> R {
        let mut page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut page)
    }

    /// Re-render with a new document height
    pub fn set_document_height(&self, height: f64) {
        self.with_page(|page| {
            page.document_height = height.max(0.0);
            page.clamp_offset();
        });
    }

    /// A scroll driven by the user (wheel, touch); bypasses `ScrollTarget`
    pub fn user_scroll_to(&self, offset: f64) -> f64 {
        self.with_page(|page| {
            page.offset = offset;
            page.clamp_offset();
            page.offset
        })
    }

    /// Every request that reached the viewport, oldest first
    pub fn applied_requests(&self) -> Vec<ScrollRequest> {
        self.with_page(|page| page.applied.clone())
    }

    pub fn active_watches(&self) -> usize {
        self.with_page(|page| page.watches.len())
    }
}

impl ScrollTarget for SimulatedViewport {
    fn scroll_to(&self, request: ScrollRequest) {
        self.with_page(|page| {
            page.applied.push(request);
            page.offset = request.target_y();
            page.clamp_offset();
        });
    }
}

impl Viewport for SimulatedViewport {
    fn scroll_offset(&self) -> f64 {
        self.with_page(|page| page.offset)
    }

    fn document_height(&self) -> f64 {
        self.with_page(|page| page.document_height)
    }

    fn viewport_height(&self) -> f64 {
        self.with_page(|page| page.viewport_height)
    }
}

impl ContentWatcher for SimulatedViewport {
    fn watch(&self) -> WatchHandle {
        self.with_page(|page| {
            page.next_watch += 1;
            let handle = WatchHandle(page.next_watch);
            page.watches.insert(handle);
            handle
        })
    }

    fn unwatch(&self, handle: WatchHandle) {
        self.with_page(|page| {
            page.watches.remove(&handle);
        });
    }
}
