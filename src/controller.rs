//! Restoration controller.
//!
//! On arrival at a scrollable route with a saved offset, the controller
//! opens a restoration session and drives the viewport back to that offset.
//! The destination content is usually still loading, so the session waits
//! for the page to become tall enough, racing two signals:
//!
//! - mutation batches from the content container (fast, but not every
//!   height change produces one)
//! - a fixed-interval poll bounded by `max_attempts` (slow, always works)
//!
//! Whichever sees enough extent first issues the scroll and tears the other
//! down. If polling runs out, the scroll is forced anyway. Either way the
//! reset guard stays armed for a short grace window afterwards to absorb the
//! framework's late scroll-to-top, then the session ends.
//!
//! At most one session exists. A new navigation tears the old one down
//! synchronously before doing anything else, so nothing from a superseded
//! session can touch the viewport or the guard afterwards.
//!
//! The controller is timer-agnostic: callers invoke [`RestorationController::tick`]
//! at or after [`RestorationController::next_deadline`].

use crate::config::RestoreConfig;
use crate::context::SharedScrollContext;
use crate::guard::GuardedScrollTarget;
use crate::route::{RouteCategory, RouteId};
use crate::services::time_source::SharedTimeSource;
use crate::viewport::{ContentWatcher, ScrollRequest, ScrollTarget, Viewport, WatchHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Externally visible state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorationPhase {
    Idle,
    /// Waiting for the page to grow tall enough
    Attempting,
    /// Scroll issued, guard still absorbing late resets
    Settling,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Reached the target once the page was tall enough
    Restored,
    /// Polling ran out; the target was forced
    Exhausted,
    /// A later navigation cancelled it
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub id: u64,
    pub route: RouteId,
    pub target: f64,
    /// Polls performed
    pub attempts: u32,
    pub outcome: SessionOutcome,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Attempting {
        next_poll: Instant,
        watch: Option<WatchHandle>,
    },
    Settling {
        release_at: Instant,
        forced: bool,
    },
}

#[derive(Debug)]
struct RestorationSession {
    id: u64,
    route: RouteId,
    target: f64,
    attempts: u32,
    stage: Stage,
}

pub struct RestorationController {
    ctx: SharedScrollContext,
    timing: RestoreConfig,
    viewport: Arc<dyn Viewport>,
    scroller: GuardedScrollTarget<dyn Viewport>,
    watcher: Option<Arc<dyn ContentWatcher>>,
    time: SharedTimeSource,

    /// Last route seen and its category
    previous: Option<(RouteId, RouteCategory)>,
    /// Last scrollable route; the page an overlay sits on
    underlying: Option<RouteId>,

    session: Option<RestorationSession>,
    next_session_id: u64,
    reports: Vec<SessionReport>,
}

impl RestorationController {
    pub fn new(
        ctx: SharedScrollContext,
        viewport: Arc<dyn Viewport>,
        timing: RestoreConfig,
        time: SharedTimeSource,
    ) -> Self {
        let scroller = GuardedScrollTarget::new(viewport.clone(), ctx.guard().clone());
        Self {
            ctx,
            timing,
            viewport,
            scroller,
            watcher: None,
            time,
            previous: None,
            underlying: None,
            session: None,
            next_session_id: 0,
            reports: Vec::new(),
        }
    }

    /// Enable the mutation-observation path
    pub fn with_watcher(mut self, watcher: Arc<dyn ContentWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// The guarded scroll primitive shared with the host
    pub fn scroll_target(&self) -> GuardedScrollTarget<dyn Viewport> {
        self.scroller.clone()
    }

    pub fn phase(&self) -> RestorationPhase {
        match self.session.as_ref().map(|s| s.stage) {
            None => RestorationPhase::Idle,
            Some(Stage::Attempting { .. }) => RestorationPhase::Attempting,
            Some(Stage::Settling { .. }) => RestorationPhase::Settling,
        }
    }

    /// When `tick` next has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| match s.stage {
            Stage::Attempting { next_poll, .. } => next_poll,
            Stage::Settling { release_at, .. } => release_at,
        })
    }

    /// Drain reports of finished sessions
    pub fn take_reports(&mut self) -> Vec<SessionReport> {
        std::mem::take(&mut self.reports)
    }

    /// Handle a route-change notification
    pub fn on_route_change(&mut self, route: &RouteId, category: RouteCategory) {
        let origin = self.previous.replace((route.clone(), category));

        match category {
            RouteCategory::Overlay => {
                tracing::debug!("Overlay {} opened, leaving restoration alone", route);
                return;
            }
            RouteCategory::NonScrolling => {
                self.supersede();
                return;
            }
            RouteCategory::Scrollable => {}
        }

        let target = self.ctx.positions().load(route);
        let back_from_overlay = matches!(origin, Some((_, RouteCategory::Overlay)))
            && self.underlying.as_ref() == Some(route);
        self.underlying = Some(route.clone());
        if back_from_overlay && self.is_at(target) {
            tracing::debug!("Returned from overlay to {}, position undisturbed", route);
            return;
        }

        self.supersede();

        if target > 0.0 {
            self.begin(route.clone(), target);
        }
    }

    /// Handle one mutation batch from the content container
    pub fn on_content_mutation(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };

        let observing = matches!(session.stage, Stage::Attempting { watch: Some(_), .. });
        let landed = observing && self.extent_reaches(session.target);
        if landed {
            tracing::debug!(
                "Content grew enough for {} after {} polls",
                session.route,
                session.attempts
            );
            self.land(&mut session, false);
        }

        self.session = Some(session);
        landed
    }

    /// Run whatever is due: a poll, or the end of the grace window
    pub fn tick(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let now = self.time.now();

        match session.stage {
            Stage::Attempting { next_poll, watch } if now >= next_poll => {
                session.attempts += 1;
                if self.extent_reaches(session.target) {
                    tracing::debug!(
                        "Poll {} reached {} for {}",
                        session.attempts,
                        session.target,
                        session.route
                    );
                    self.land(&mut session, false);
                } else if session.attempts >= self.timing.max_attempts {
                    tracing::warn!(
                        "Content for {} never reached {} after {} polls, forcing scroll",
                        session.route,
                        session.target,
                        session.attempts
                    );
                    self.land(&mut session, true);
                } else {
                    session.stage = Stage::Attempting {
                        next_poll: now + self.timing.poll_interval(),
                        watch,
                    };
                }
            }
            Stage::Settling { release_at, forced } if now >= release_at => {
                self.ctx.guard().disarm();
                let outcome = if forced {
                    SessionOutcome::Exhausted
                } else {
                    SessionOutcome::Restored
                };
                self.finish(session, outcome);
                return;
            }
            _ => {}
        }

        self.session = Some(session);
    }

    fn begin(&mut self, route: RouteId, target: f64) {
        self.next_session_id += 1;
        let id = self.next_session_id;
        tracing::info!("Restoring {} to {} (session {})", route, target, id);

        self.ctx.guard().arm(self.timing.guard_hard_cap());

        let mut session = RestorationSession {
            id,
            route,
            target,
            attempts: 0,
            stage: Stage::Attempting {
                next_poll: self.time.now() + self.timing.poll_interval(),
                watch: None,
            },
        };

        if self.extent_reaches(target) {
            self.land(&mut session, false);
        } else if let Some(watcher) = &self.watcher {
            if let Stage::Attempting { watch, .. } = &mut session.stage {
                *watch = Some(watcher.watch());
            }
        }

        self.session = Some(session);
    }

    /// Issue the scroll to the target and enter the grace window
    fn land(&self, session: &mut RestorationSession, forced: bool) {
        self.scroller.scroll_to(ScrollRequest::to_y(session.target));
        self.ctx.note_engine_scroll(self.viewport.scroll_offset());
        self.unwatch(session);

        let grace = self.timing.grace_window();
        self.ctx.guard().narrow_to(grace);
        session.stage = Stage::Settling {
            release_at: self.time.now() + grace,
            forced,
        };
    }

    /// Tear down the active session, if any
    fn supersede(&mut self) {
        if let Some(session) = self.session.take() {
            self.unwatch(&session);
            self.ctx.guard().disarm();
            self.finish(session, SessionOutcome::Superseded);
        }
    }

    fn unwatch(&self, session: &RestorationSession) {
        if let Stage::Attempting {
            watch: Some(handle),
            ..
        } = session.stage
        {
            if let Some(watcher) = &self.watcher {
                watcher.unwatch(handle);
            }
        }
    }

    fn finish(&mut self, session: RestorationSession, outcome: SessionOutcome) {
        tracing::debug!(
            "Restoration session {} for {} ended: {:?}",
            session.id,
            session.route,
            outcome
        );
        self.reports.push(SessionReport {
            id: session.id,
            route: session.route,
            target: session.target,
            attempts: session.attempts,
            outcome,
        });
    }

    /// Whether the viewport already sits at `target` (or nothing is saved)
    fn is_at(&self, target: f64) -> bool {
        target <= 0.0 || (self.viewport.scroll_offset() - target).abs() <= self.timing.tolerance_px
    }

    fn extent_reaches(&self, target: f64) -> bool {
        self.viewport.max_scroll_extent() >= target - self.timing.tolerance_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScrollContext;
    use crate::services::time_source::{TestTimeSource, TimeSource};
    use crate::viewport::SimulatedViewport;
    use std::time::Duration;

    const VIEWPORT: f64 = 800.0;

    struct Fixture {
        time: Arc<TestTimeSource>,
        ctx: SharedScrollContext,
        page: SimulatedViewport,
        controller: RestorationController,
        timing: RestoreConfig,
    }

    fn fixture_with(timing: RestoreConfig, observe: bool) -> Fixture {
        let time = TestTimeSource::shared();
        let ctx = ScrollContext::shared(time.clone());
        let page = SimulatedViewport::new(VIEWPORT, VIEWPORT);
        let mut controller = RestorationController::new(
            ctx.clone(),
            Arc::new(page.clone()),
            timing.clone(),
            time.clone(),
        );
        if observe {
            controller = controller.with_watcher(Arc::new(page.clone()));
        }
        Fixture {
            time,
            ctx,
            page,
            controller,
            timing,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RestoreConfig::default(), true)
    }

    impl Fixture {
        /// Advance the clock deadline by deadline until `span` has passed
        fn run_for(&mut self, span: Duration) {
            let end = self.time.now() + span;
            while let Some(deadline) = self.controller.next_deadline() {
                if deadline > end {
                    break;
                }
                self.time.advance_to(deadline);
                self.controller.tick();
            }
            self.time.advance_to(end);
        }

        fn arrive(&mut self, route: &str) {
            self.controller
                .on_route_change(&route.into(), RouteCategory::Scrollable);
        }
    }

    #[test]
    fn test_nothing_saved_stays_idle() {
        let mut f = fixture();
        f.arrive("/feed/item/42");
        assert_eq!(f.controller.phase(), RestorationPhase::Idle);
        assert!(!f.ctx.guard().is_armed());
        assert!(f.page.applied_requests().is_empty());
    }

    #[test]
    fn test_immediate_restore_when_tall_enough() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(3000.0);

        f.arrive("/feed");
        assert_eq!(f.page.scroll_offset(), 1200.0);
        assert_eq!(f.controller.phase(), RestorationPhase::Settling);
        assert!(f.ctx.guard().is_armed());
        assert_eq!(f.page.active_watches(), 0);

        f.run_for(f.timing.grace_window());
        assert_eq!(f.controller.phase(), RestorationPhase::Idle);
        assert!(!f.ctx.guard().is_armed());

        let reports = f.controller.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, SessionOutcome::Restored);
        assert_eq!(reports[0].attempts, 0);
    }

    #[test]
    fn test_tolerance_allows_slightly_short_page() {
        let mut f = fixture();
        let tolerance = f.timing.tolerance_px;
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(VIEWPORT + 1200.0 - tolerance);

        f.arrive("/feed");
        assert_eq!(f.controller.phase(), RestorationPhase::Settling);
        assert_eq!(f.page.scroll_offset(), 1200.0 - tolerance);
    }

    #[test]
    fn test_mutation_path_restores() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        assert_eq!(f.controller.phase(), RestorationPhase::Attempting);
        assert_eq!(f.page.active_watches(), 1);
        assert!(f.ctx.guard().is_armed());

        f.page.set_document_height(1500.0);
        assert!(!f.controller.on_content_mutation());
        assert_eq!(f.page.scroll_offset(), 0.0);

        f.page.set_document_height(2400.0);
        assert!(f.controller.on_content_mutation());
        assert_eq!(f.page.scroll_offset(), 1200.0);
        assert_eq!(f.page.active_watches(), 0);
        assert_eq!(f.controller.phase(), RestorationPhase::Settling);
    }

    #[test]
    fn test_poll_path_restores_without_watcher() {
        let mut f = fixture_with(RestoreConfig::default(), false);
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        assert!(!f.controller.on_content_mutation());

        f.run_for(f.timing.poll_interval() * 3);
        assert_eq!(f.page.scroll_offset(), 0.0);

        f.page.set_document_height(2400.0);
        f.run_for(f.timing.poll_interval());
        assert_eq!(f.page.scroll_offset(), 1200.0);

        f.run_for(f.timing.grace_window());
        let reports = f.controller.take_reports();
        assert_eq!(reports[0].outcome, SessionOutcome::Restored);
        assert_eq!(reports[0].attempts, 4);
    }

    #[test]
    fn test_exhaustion_forces_scroll() {
        let timing = RestoreConfig {
            max_attempts: 5,
            ..RestoreConfig::default()
        };
        let mut f = fixture_with(timing, true);
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(1000.0);

        f.arrive("/feed");
        f.run_for(f.timing.polling_budget() + f.timing.grace_window());

        // forced scroll lands as far as the page allows
        assert_eq!(f.page.scroll_offset(), 200.0);
        assert_eq!(f.page.applied_requests(), vec![ScrollRequest::to_y(1200.0)]);
        assert_eq!(f.page.active_watches(), 0);
        assert_eq!(f.controller.phase(), RestorationPhase::Idle);

        let reports = f.controller.take_reports();
        assert_eq!(reports[0].outcome, SessionOutcome::Exhausted);
        assert_eq!(reports[0].attempts, 5);
    }

    #[test]
    fn test_guard_released_by_hard_cap_during_long_wait() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        f.run_for(f.timing.guard_hard_cap());

        assert_eq!(f.controller.phase(), RestorationPhase::Attempting);
        assert!(!f.ctx.guard().is_armed());
    }

    #[test]
    fn test_new_navigation_supersedes() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        assert_eq!(f.page.active_watches(), 1);

        f.arrive("/search");
        assert_eq!(f.controller.phase(), RestorationPhase::Idle);
        assert_eq!(f.page.active_watches(), 0);
        assert!(!f.ctx.guard().is_armed());

        f.page.set_document_height(5000.0);
        f.controller.on_content_mutation();
        f.run_for(f.timing.polling_budget());
        assert!(f.page.applied_requests().is_empty());

        let reports = f.controller.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, SessionOutcome::Superseded);
    }

    #[test]
    fn test_non_scrolling_arrival_cancels() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.ctx.save_scroll_position(&"/watch".into(), 900.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        f.controller
            .on_route_change(&"/watch".into(), RouteCategory::NonScrolling);

        assert_eq!(f.controller.phase(), RestorationPhase::Idle);
        f.page.set_document_height(5000.0);
        f.run_for(f.timing.polling_budget());
        assert!(f.page.applied_requests().is_empty());
    }

    #[test]
    fn test_overlay_leaves_session_running() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        f.controller
            .on_route_change(&"/settings".into(), RouteCategory::Overlay);
        assert_eq!(f.controller.phase(), RestorationPhase::Attempting);

        f.page.set_document_height(2400.0);
        assert!(f.controller.on_content_mutation());
        assert_eq!(f.page.scroll_offset(), 1200.0);
    }

    #[test]
    fn test_return_from_overlay_is_a_no_op() {
        let mut f = fixture();
        f.page.set_document_height(3000.0);
        f.arrive("/profile");
        f.page.user_scroll_to(800.0);
        f.ctx.save_scroll_position(&"/profile".into(), 800.0);

        f.controller
            .on_route_change(&"/settings".into(), RouteCategory::Overlay);
        f.arrive("/profile");

        assert_eq!(f.controller.phase(), RestorationPhase::Idle);
        assert!(f.page.applied_requests().is_empty());
        assert_eq!(f.page.scroll_offset(), 800.0);
    }

    #[test]
    fn test_return_from_overlay_repairs_disturbed_position() {
        let mut f = fixture();
        f.page.set_document_height(3000.0);
        f.arrive("/profile");
        f.ctx.save_scroll_position(&"/profile".into(), 800.0);

        f.controller
            .on_route_change(&"/settings".into(), RouteCategory::Overlay);
        // host reset the root while the overlay was open
        f.page.user_scroll_to(0.0);
        f.arrive("/profile");

        assert_eq!(f.page.scroll_offset(), 800.0);
        assert_eq!(f.controller.phase(), RestorationPhase::Settling);
    }

    #[test]
    fn test_overlay_to_other_page_restores_normally() {
        let mut f = fixture();
        f.page.set_document_height(3000.0);
        f.ctx.save_scroll_position(&"/feed".into(), 500.0);
        f.arrive("/profile");

        f.controller
            .on_route_change(&"/settings".into(), RouteCategory::Overlay);
        f.arrive("/feed");

        assert_eq!(f.page.scroll_offset(), 500.0);
    }

    #[test]
    fn test_first_arrival_restores_existing_entry() {
        let mut f = fixture();
        f.ctx.save_scroll_position(&"/".into(), 640.0);
        f.page.set_document_height(2000.0);

        f.arrive("/");
        assert_eq!(f.page.scroll_offset(), 640.0);
    }

    #[test]
    fn test_controller_scroll_passes_armed_guard() {
        let mut f = fixture();
        let host = f.controller.scroll_target();
        f.ctx.save_scroll_position(&"/feed".into(), 1200.0);
        f.page.set_document_height(600.0);

        f.arrive("/feed");
        host.scroll_to(ScrollRequest::default());
        assert!(f.page.applied_requests().is_empty());

        f.page.set_document_height(2400.0);
        f.controller.on_content_mutation();
        host.scroll_to(ScrollRequest::default());
        assert_eq!(f.page.scroll_offset(), 1200.0);

        f.run_for(f.timing.grace_window());
        host.scroll_to(ScrollRequest::default());
        assert_eq!(f.page.scroll_offset(), 0.0);
    }

    #[test]
    fn test_timing_is_configurable() {
        for (poll_ms, attempts) in [(16, 10), (50, 3), (250, 2)] {
            let timing = RestoreConfig {
                poll_interval_ms: poll_ms,
                max_attempts: attempts,
                ..RestoreConfig::default()
            };
            let mut f = fixture_with(timing, false);
            f.ctx.save_scroll_position(&"/feed".into(), 1000.0);
            f.page.set_document_height(500.0);
            f.arrive("/feed");

            f.run_for(f.timing.polling_budget() - Duration::from_millis(1));
            assert_eq!(f.controller.phase(), RestorationPhase::Attempting);

            f.run_for(Duration::from_millis(1));
            assert_eq!(f.controller.phase(), RestorationPhase::Settling);
        }
    }
}
