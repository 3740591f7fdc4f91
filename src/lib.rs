// Scroll-position continuity engine - exposes all core modules for embedding and testing

pub mod config;
pub mod context;
pub mod controller;
#[cfg(feature = "runtime")]
pub mod driver;
pub mod guard;
pub mod keeper;
pub mod listener;
pub mod route;
pub mod scenario;
pub mod services;
pub mod store;
pub mod viewport;

pub use config::{ConfigError, RestoreConfig, RouteRules, ScrollConfig};
pub use context::{ScrollContext, SharedScrollContext};
pub use controller::{RestorationPhase, SessionOutcome, SessionReport};
pub use keeper::ScrollKeeper;
pub use route::{RouteCategory, RouteClassifier, RouteId};
pub use viewport::{ContentWatcher, ScrollRequest, ScrollTarget, Viewport};
