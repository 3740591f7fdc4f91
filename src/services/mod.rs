//! Ambient services: clock and logging setup

pub mod time_source;
#[cfg(feature = "runtime")]
pub mod tracing_setup;
