//! The engine facade.
//!
//! `ScrollKeeper` owns one navigation scroll context and connects the three
//! inbound signals to the components that consume them:
//!
//! - route changes are classified, then retarget the listener and drive
//!   the restoration controller
//! - root scroll events go to the listener
//! - mutation batches and timer ticks go to the controller

use crate::config::{ConfigError, ScrollConfig};
use crate::context::{ScrollContext, SharedScrollContext};
use crate::controller::{RestorationController, RestorationPhase, SessionReport};
use crate::guard::GuardedScrollTarget;
use crate::listener::ScrollListener;
use crate::route::{RouteCategory, RouteClassifier, RouteId};
use crate::services::time_source::SharedTimeSource;
use crate::viewport::{ContentWatcher, Viewport};
use std::sync::Arc;
use std::time::Instant;

pub struct ScrollKeeper {
    ctx: SharedScrollContext,
    classifier: RouteClassifier,
    listener: ScrollListener,
    controller: RestorationController,
    viewport: Arc<dyn Viewport>,
}

impl ScrollKeeper {
    pub fn new(
        config: &ScrollConfig,
        viewport: Arc<dyn Viewport>,
        time: SharedTimeSource,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = RouteClassifier::new(&config.routes)?;
        let ctx = ScrollContext::shared(time.clone());
        let controller = RestorationController::new(
            ctx.clone(),
            viewport.clone(),
            config.restore.clone(),
            time,
        );

        Ok(Self {
            listener: ScrollListener::new(ctx.clone()),
            ctx,
            classifier,
            controller,
            viewport,
        })
    }

    /// Let the controller observe content mutations while restoring
    pub fn with_watcher(mut self, watcher: Arc<dyn ContentWatcher>) -> Self {
        self.controller = self.controller.with_watcher(watcher);
        self
    }

    /// Shared state for screens that read or contribute positions by hand
    pub fn context(&self) -> SharedScrollContext {
        self.ctx.clone()
    }

    /// The guarded scroll-to primitive. Every other caller that scrolls the
    /// root viewport, the host framework included, must go through this.
    pub fn scroll_target(&self) -> GuardedScrollTarget<dyn Viewport> {
        self.controller.scroll_target()
    }

    pub fn classify(&self, route: &RouteId) -> RouteCategory {
        self.classifier.classify(route)
    }

    /// Route-change notification, once per navigation
    pub fn on_route_change(&mut self, route: impl Into<RouteId>) {
        let route = route.into();
        let category = self.classifier.classify(&route);
        tracing::debug!("Navigated to {} ({:?})", route, category);

        self.listener.on_arrival(&route, category);
        self.controller.on_route_change(&route, category);
    }

    /// Root viewport scroll event; reads the live offset
    pub fn on_viewport_scroll(&self) -> bool {
        self.listener.on_scroll(self.viewport.scroll_offset())
    }

    pub fn on_content_mutation(&mut self) -> bool {
        self.controller.on_content_mutation()
    }

    pub fn tick(&mut self) {
        self.controller.tick();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }

    pub fn phase(&self) -> RestorationPhase {
        self.controller.phase()
    }

    pub fn take_reports(&mut self) -> Vec<SessionReport> {
        self.controller.take_reports()
    }

    pub fn save_scroll_position(&self, route: &RouteId, offset: f64) -> bool {
        self.ctx.save_scroll_position(route, offset)
    }

    pub fn get_saved_scroll_position(&self, route: &RouteId) -> f64 {
        self.ctx.get_saved_scroll_position(route)
    }
}
