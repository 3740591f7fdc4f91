//! Per-route cache of last-known scroll offsets.

use crate::route::RouteId;
use crate::services::time_source::SharedTimeSource;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

/// Last recorded offset for one route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    /// Vertical offset in CSS pixels, always > 0
    pub offset: f64,
    /// When the offset was last written
    pub saved_at: Instant,
}

/// Position store
///
/// Maps route identities to the last non-zero offset observed for them.
/// Zero is never stored: a saved zero is indistinguishable from nothing
/// saved, and it would clobber a good value during a transition when the
/// framework has already reset the viewport.
#[derive(Debug)]
pub struct PositionStore {
    records: RwLock<HashMap<RouteId, PositionRecord>>,
    time: SharedTimeSource,
}

impl PositionStore {
    pub fn new(time: SharedTimeSource) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            time,
        }
    }

    /// Store `offset` for `route` if it is a positive, finite number.
    ///
    /// Returns whether the record was written.
    pub fn save(&self, route: &RouteId, offset: f64) -> bool {
        if !(offset.is_finite() && offset > 0.0) {
            return false;
        }

        let record = PositionRecord {
            offset,
            saved_at: self.time.now(),
        };
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(route.clone(), record);
        true
    }

    /// Saved offset for `route`, or 0 when nothing is saved
    pub fn load(&self, route: &RouteId) -> f64 {
        self.record(route).map_or(0.0, |record| record.offset)
    }

    pub fn record(&self, route: &RouteId) -> Option<PositionRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(route)
            .copied()
    }

    /// Drop the record for `route`, returning the offset it held
    pub fn forget(&self, route: &RouteId) -> Option<f64> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(route)
            .map(|record| record.offset)
    }

    /// All saved offsets, sorted by route
    pub fn snapshot(&self) -> Vec<(RouteId, f64)> {
        let mut entries: Vec<_> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(route, record)| (route.clone(), record.offset))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
