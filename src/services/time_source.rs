//! Time source abstraction for testability.
//!
//! Restoration sessions are driven by deadlines (poll interval, grace window,
//! guard hard cap). Every component reads the clock through a `TimeSource`
//! so production code uses real time while tests advance a logical clock
//! and observe timer-driven behavior deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Abstraction over the clock used by the scroll engine.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Get the current instant for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Calculate elapsed time since an earlier instant.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Type alias for shared time source.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Production implementation using actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl RealTimeSource {
    /// Create a new RealTimeSource.
    pub fn new() -> Self {
        Self
    }

    /// Create a shared RealTimeSource.
    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

impl TimeSource for RealTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test implementation with controllable time.
///
/// - `now()` returns a logical instant based on internal counter
/// - Time only moves when `advance()` is called
///
/// # Example
///
/// ```
/// use scroll_keeper::services::time_source::{TimeSource, TestTimeSource};
/// use std::time::Duration;
///
/// let time = TestTimeSource::new();
/// let start = time.now();
///
/// time.advance(Duration::from_millis(250));
///
/// assert_eq!(time.elapsed_since(start), Duration::from_millis(250));
/// ```
#[derive(Debug)]
pub struct TestTimeSource {
    /// Logical time in nanoseconds since creation.
    logical_nanos: AtomicU64,
    /// Base instant (real time at creation, used for Instant arithmetic).
    base_instant: Instant,
}

impl Default for TestTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTimeSource {
    /// Create a new TestTimeSource with logical time starting at zero.
    pub fn new() -> Self {
        Self {
            logical_nanos: AtomicU64::new(0),
            base_instant: Instant::now(),
        }
    }

    /// Create a shared TestTimeSource.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance logical time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.logical_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Advance logical time up to `instant`. Instants in the past are ignored.
    pub fn advance_to(&self, instant: Instant) {
        let delta = instant.saturating_duration_since(self.now());
        if !delta.is_zero() {
            self.advance(delta);
        }
    }

    /// Get the logical elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.logical_nanos.load(Ordering::SeqCst))
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> Instant {
        // base + logical elapsed keeps the returned Instant valid for arithmetic
        self.base_instant + self.elapsed()
    }
}

/// Clock that follows tokio's timer wheel.
///
/// Under `tokio::time::pause()` this advances with the runtime's virtual
/// clock, so deadlines computed by the engine line up with `sleep_until`.
#[cfg(feature = "runtime")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeSource;

#[cfg(feature = "runtime")]
impl TokioTimeSource {
    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

#[cfg(feature = "runtime")]
impl TimeSource for TokioTimeSource {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
