//! Async event loop for the scroll engine.
//!
//! Hosts that deliver navigation, scroll and mutation signals from async
//! code send them through a [`DriverHandle`]; [`run`] owns the
//! [`ScrollKeeper`] and interleaves those signals with the controller's
//! timers on a single task. Each loop iteration races the next inbound
//! event against `sleep_until(next_deadline)`, so the mutation path and the
//! polling path of a restoration session compete exactly as they would on
//! a browser event loop.
//!
//! Use [`TokioTimeSource`](crate::services::time_source::TokioTimeSource)
//! for the keeper so its deadlines are measured on tokio's clock.
//!
//! The loop drains session reports as they are produced. [`run`] drops
//! them; [`run_with_reports`] forwards them to a channel.

use crate::controller::SessionReport;
use crate::keeper::ScrollKeeper;
use crate::route::RouteId;
use std::time::Instant;
use tokio::sync::mpsc;

/// Signals the host delivers to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    RouteChanged(RouteId),
    Scrolled,
    ContentMutated,
    Shutdown,
}

/// The driver task has exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverClosed;

impl std::fmt::Display for DriverClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scroll driver is no longer running")
    }
}

impl std::error::Error for DriverClosed {}

/// Cloneable sender side of the driver
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<NavigationEvent>,
}

impl DriverHandle {
    pub fn route_changed(&self, route: impl Into<RouteId>) -> Result<(), DriverClosed> {
        self.send(NavigationEvent::RouteChanged(route.into()))
    }

    pub fn scrolled(&self) -> Result<(), DriverClosed> {
        self.send(NavigationEvent::Scrolled)
    }

    pub fn content_mutated(&self) -> Result<(), DriverClosed> {
        self.send(NavigationEvent::ContentMutated)
    }

    pub fn shutdown(&self) -> Result<(), DriverClosed> {
        self.send(NavigationEvent::Shutdown)
    }

    fn send(&self, event: NavigationEvent) -> Result<(), DriverClosed> {
        self.tx.send(event).map_err(|_| DriverClosed)
    }
}

pub fn channel() -> (DriverHandle, mpsc::UnboundedReceiver<NavigationEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DriverHandle { tx }, rx)
}

/// Run the engine until `Shutdown` arrives or every handle is dropped.
///
/// Returns the keeper so callers can inspect its final state.
pub async fn run(
    keeper: ScrollKeeper,
    events: mpsc::UnboundedReceiver<NavigationEvent>,
) -> ScrollKeeper {
    drive(keeper, events, None).await
}

/// Like [`run`], sending the report of every finished session to `reports`
pub async fn run_with_reports(
    keeper: ScrollKeeper,
    events: mpsc::UnboundedReceiver<NavigationEvent>,
    reports: mpsc::UnboundedSender<SessionReport>,
) -> ScrollKeeper {
    drive(keeper, events, Some(reports)).await
}

async fn drive(
    mut keeper: ScrollKeeper,
    mut events: mpsc::UnboundedReceiver<NavigationEvent>,
    reports: Option<mpsc::UnboundedSender<SessionReport>>,
) -> ScrollKeeper {
    tracing::debug!("Scroll driver started");

    loop {
        let deadline = keeper.next_deadline();

        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(NavigationEvent::RouteChanged(route)) => keeper.on_route_change(route),
                Some(NavigationEvent::Scrolled) => {
                    keeper.on_viewport_scroll();
                }
                Some(NavigationEvent::ContentMutated) => {
                    keeper.on_content_mutation();
                }
                Some(NavigationEvent::Shutdown) | None => break,
            },

            _ = sleep_until(deadline) => keeper.tick(),
        }

        for report in keeper.take_reports() {
            if let Some(reports) = &reports {
                let _ = reports.send(report);
            }
        }
    }

    tracing::debug!("Scroll driver stopped");
    keeper
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
