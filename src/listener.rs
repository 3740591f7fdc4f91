//! Scroll listener.
//!
//! One listener for the whole session, fed by every root scroll event. It
//! records continuously instead of on unmount: by the time a screen
//! unmounts, the framework has usually already reset the viewport, and a
//! save at that point would overwrite the good value with zero.

use crate::context::SharedScrollContext;
use crate::route::{RouteCategory, RouteId};

/// Sub-pixel rounding between the requested and the reported offset
const ENGINE_SCROLL_SLOP_PX: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct ScrollListener {
    ctx: SharedScrollContext,
}

impl ScrollListener {
    pub fn new(ctx: SharedScrollContext) -> Self {
        Self { ctx }
    }

    /// Handle one scroll event carrying the live offset.
    ///
    /// Returns whether a position was recorded. Events that only report
    /// where the engine's restoring scroll landed are not recorded, so a
    /// landing clamped by a short page never replaces the user's offset.
    pub fn on_scroll(&self, live_offset: f64) -> bool {
        let route = self.ctx.update_listening(|target| {
            if target.suspended {
                return None;
            }
            if let Some(landed) = target.engine_offset {
                if (live_offset - landed).abs() < ENGINE_SCROLL_SLOP_PX {
                    return None;
                }
                target.engine_offset = None;
            }
            target.route.clone()
        });

        match route {
            Some(route) => self.ctx.positions().save(&route, live_offset),
            None => false,
        }
    }

    /// Apply the target-identity rule for an arrival at `route`.
    ///
    /// Scrollable routes take over the listener. Overlays and
    /// non-scrolling pages leave the target alone but suspend recording,
    /// so the route underneath keeps its last good value.
    pub fn on_arrival(&self, route: &RouteId, category: RouteCategory) {
        self.ctx.update_listening(|target| {
            target.engine_offset = None;
            if category.owns_viewport() {
                if target.route.as_ref() != Some(route) {
                    tracing::debug!("Scroll listener now recording for {}", route);
                }
                target.route = Some(route.clone());
                target.suspended = false;
            } else {
                target.suspended = true;
            }
        });
    }
}
