//! Shared pairwise-distance cache for one clustering run.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::error::Result;

/// Concurrent map from an unordered id pair to its distance.
///
/// Keys are canonicalized as `(min_id, max_id)`. Entries are never
/// invalidated: within one build the vectors and the distance configuration
/// are fixed, so a distance is a pure function of the pair. Two workers
/// racing on the same missing pair both compute it; the first insert wins
/// and both observe the same value.
#[derive(Debug, Default)]
pub struct DistanceCache {
    entries: DashMap<(u32, u32), f32>,
    computed: AtomicUsize,
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for roughly `pairs` entries.
    pub fn with_capacity(pairs: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(pairs),
            computed: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn key(a: u32, b: u32) -> (u32, u32) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn get(&self, a: u32, b: u32) -> Option<f32> {
        self.entries.get(&Self::key(a, b)).map(|d| *d)
    }

    /// Cached distance for `(a, b)`, running `compute` on a miss.
    pub fn get_or_compute<F>(&self, a: u32, b: u32, compute: F) -> Result<f32>
    where
        F: FnOnce() -> Result<f32>,
    {
        let key = Self::key(a, b);
        if let Some(d) = self.entries.get(&key) {
            return Ok(*d);
        }
        let d = compute()?;
        self.computed.fetch_add(1, Ordering::Relaxed);
        Ok(*self.entries.entry(key).or_insert(d))
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times a distance was actually computed.
    pub fn computations(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }
}
