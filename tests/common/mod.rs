#![allow(dead_code)]

pub mod tracing;

use scroll_keeper::config::{RestoreConfig, ScrollConfig};
use scroll_keeper::scenario::Replayer;

pub const VIEWPORT: f64 = 800.0;

/// Timing sets the suite runs against; none of the properties depend on
/// the default constants
pub fn timing_variants() -> Vec<RestoreConfig> {
    vec![
        RestoreConfig::default(),
        RestoreConfig {
            tolerance_px: 0.0,
            poll_interval_ms: 16,
            max_attempts: 120,
            grace_window_ms: 50,
            guard_hard_cap_ms: 1000,
        },
        RestoreConfig {
            tolerance_px: 10.0,
            poll_interval_ms: 250,
            max_attempts: 4,
            grace_window_ms: 400,
            guard_hard_cap_ms: 3000,
        },
    ]
}

pub fn replayer(restore: &RestoreConfig) -> Replayer {
    tracing::init_tracing_from_env();
    let config = ScrollConfig {
        restore: restore.clone(),
        ..ScrollConfig::default()
    };
    Replayer::new(&config, VIEWPORT).unwrap()
}
