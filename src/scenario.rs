//! Scripted replay of a navigation session.
//!
//! A [`Scenario`] describes what a user and the page did: navigations,
//! scrolls, content growing as data arrives, time passing. [`Replayer`]
//! plays it against a [`ScrollKeeper`] on a [`SimulatedViewport`] with a
//! logical clock, standing in for the host application:
//!
//! - after each navigation it issues the framework's default scroll-to-top
//!   through the guarded target
//! - whenever the viewport offset changes it delivers a scroll event
//! - content height changes are reported as mutation batches while the
//!   engine is observing (unless the step says they are not observable)

use crate::config::{ConfigError, ScrollConfig};
use crate::controller::SessionReport;
use crate::keeper::ScrollKeeper;
use crate::route::RouteId;
use crate::services::time_source::{TestTimeSource, TimeSource};
use crate::viewport::{ScrollRequest, ScrollTarget, SimulatedViewport, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Document height before the first step
    #[serde(default = "default_viewport_height")]
    pub initial_content_height: f64,

    #[serde(default)]
    pub config: ScrollConfig,

    pub steps: Vec<Step>,
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate; `content_height` is the destination's first render
    Navigate {
        route: RouteId,
        #[serde(default)]
        content_height: Option<f64>,
    },
    UserScroll {
        offset: f64,
    },
    /// Content re-rendered at a new height
    ContentHeight {
        height: f64,
        #[serde(default = "default_true")]
        observable: bool,
    },
    /// A late scroll-to-top from the framework
    FrameworkReset,
    Wait {
        ms: u64,
    },
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub final_offset: f64,
    pub positions: Vec<(RouteId, f64)>,
    pub sessions: Vec<SessionReport>,
    /// Vertical offsets of every scroll request that reached the viewport
    pub applied_scrolls: Vec<f64>,
}

impl Scenario {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn replay(&self) -> Result<ReplayReport, ConfigError> {
        let mut replayer = Replayer::new(&self.config, self.viewport_height)?;
        replayer.page().set_document_height(self.initial_content_height);
        for step in &self.steps {
            replayer.apply(step);
        }
        Ok(replayer.finish())
    }
}

/// Drives a [`ScrollKeeper`] the way a host application would
pub struct Replayer {
    keeper: ScrollKeeper,
    page: SimulatedViewport,
    time: Arc<TestTimeSource>,
    last_offset: f64,
    sessions: Vec<SessionReport>,
}

impl Replayer {
    pub fn new(config: &ScrollConfig, viewport_height: f64) -> Result<Self, ConfigError> {
        let time = TestTimeSource::shared();
        let page = SimulatedViewport::new(viewport_height, viewport_height);
        let keeper = ScrollKeeper::new(config, Arc::new(page.clone()), time.clone())?
            .with_watcher(Arc::new(page.clone()));

        Ok(Self {
            keeper,
            page,
            time,
            last_offset: 0.0,
            sessions: Vec::new(),
        })
    }

    pub fn keeper(&self) -> &ScrollKeeper {
        &self.keeper
    }

    pub fn page(&self) -> &SimulatedViewport {
        &self.page
    }

    pub fn offset(&self) -> f64 {
        self.page.scroll_offset()
    }

    pub fn saved(&self, route: &str) -> f64 {
        self.keeper.get_saved_scroll_position(&route.into())
    }

    pub fn apply(&mut self, step: &Step) {
        match step {
            Step::Navigate {
                route,
                content_height,
            } => self.navigate_with(route.clone(), *content_height),
            Step::UserScroll { offset } => self.user_scroll(*offset),
            Step::ContentHeight { height, observable } => {
                if *observable {
                    self.grow_to(*height);
                } else {
                    self.grow_silently_to(*height);
                }
            }
            Step::FrameworkReset => self.framework_reset(),
            Step::Wait { ms } => self.wait(Duration::from_millis(*ms)),
        }
    }

    pub fn navigate(&mut self, route: &str, content_height: f64) {
        self.navigate_with(route.into(), Some(content_height));
    }

    /// Navigation as the host performs it: the destination renders its
    /// first frame, the router notifies, then the framework scrolls to top
    pub fn navigate_with(&mut self, route: RouteId, content_height: Option<f64>) {
        if let Some(height) = content_height {
            self.page.set_document_height(height);
        }
        self.keeper.on_route_change(route);
        self.framework_reset();
    }

    pub fn user_scroll(&mut self, offset: f64) {
        self.page.user_scroll_to(offset);
        self.pump();
    }

    /// Content changes height and the change is observable as a mutation
    pub fn grow_to(&mut self, height: f64) {
        self.page.set_document_height(height);
        if self.page.active_watches() > 0 {
            self.keeper.on_content_mutation();
        }
        self.pump();
    }

    /// Height change with no mutation batch (CSS-driven layout)
    pub fn grow_silently_to(&mut self, height: f64) {
        self.page.set_document_height(height);
        self.pump();
    }

    pub fn framework_reset(&mut self) {
        self.keeper.scroll_target().scroll_to(ScrollRequest::default());
        self.pump();
    }

    /// Let `span` of time pass, running every deadline that falls inside it
    pub fn wait(&mut self, span: Duration) {
        let end = self.time.now() + span;
        while let Some(deadline) = self.keeper.next_deadline() {
            if deadline > end {
                break;
            }
            self.time.advance_to(deadline);
            self.keeper.tick();
            self.pump();
        }
        self.time.advance_to(end);
        self.collect();
    }

    /// Session reports gathered so far
    pub fn sessions(&mut self) -> &[SessionReport] {
        self.collect();
        &self.sessions
    }

    pub fn finish(mut self) -> ReplayReport {
        self.collect();
        ReplayReport {
            final_offset: self.page.scroll_offset(),
            positions: self.keeper.context().positions().snapshot(),
            sessions: self.sessions,
            applied_scrolls: self
                .page
                .applied_requests()
                .iter()
                .map(ScrollRequest::target_y)
                .collect(),
        }
    }

    /// Deliver a scroll event if the offset moved
    fn pump(&mut self) {
        let offset = self.page.scroll_offset();
        if offset != self.last_offset {
            self.last_offset = offset;
            self.keeper.on_viewport_scroll();
        }
    }

    fn collect(&mut self) {
        self.sessions.extend(self.keeper.take_reports());
    }
}
