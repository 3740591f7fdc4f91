//! Tracing subscriber setup
//!
//! The library only emits events; installing a subscriber is left to the
//! embedding application. This module provides the configuration used by
//! the replay binary.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber writing to `log_file_path`.
///
/// Filtering comes from `RUST_LOG`, with DEBUG as the default level.
pub fn init_global(log_file_path: &Path) -> io::Result<()> {
    let log_file = File::create(log_file_path)?;
    build_subscriber(Arc::new(log_file)).init();
    Ok(())
}

/// Initialize the global tracing subscriber writing to stderr.
pub fn init_stderr() {
    build_subscriber(io::stderr).init();
}

/// Build a subscriber around any writer.
///
/// Shared between the binary and tests so both see the same formatting.
pub fn build_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into());

    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
