//! Segment layout of a feature vector.
//!
//! A feature vector is a flat `[f32]` split into a *scalar segment* (global
//! shape scalars at fixed offsets) followed by a *histogram segment* made of
//! back-to-back sub-histograms. The layout is shared by every vector that
//! takes part in one operation; it is never stored per vector.

use std::ops::Range;
use std::sync::LazyLock;

use crate::error::{Result, RetrieveError};

/// Offsets of the scalars in [`FeatureLayout::standard`].
pub mod scalar {
    pub const AABB_VOLUME: usize = 0;
    pub const SURFACE_AREA: usize = 1;
    pub const DIAMETER: usize = 2;
    pub const ECCENTRICITY: usize = 3;
    pub const COMPACTNESS: usize = 4;
    pub const MESH_VOLUME: usize = 5;
}

/// Bins per histogram in the standard layout.
pub const STANDARD_BINS: usize = 10;

static STANDARD: LazyLock<FeatureLayout> = LazyLock::new(|| {
    let scalars = [
        "AABB_Volume",
        "Surface_Area",
        "Diameter",
        "Eccentricity",
        "Compactness",
        "Mesh_Volume",
    ];
    let histograms = [
        ("A3", std::f32::consts::PI),
        ("D1", 0.8),
        ("D2", 1.0),
        ("D3", 0.6),
        ("D4", 0.4),
    ];
    let mut layout = FeatureLayout::with_scalars(scalars.iter().map(|s| s.to_string()).collect());
    for (name, max) in histograms {
        layout.histograms.push(HistogramSpec {
            name: name.to_string(),
            bins: STANDARD_BINS,
            min: 0.0,
            max,
            start: layout.len(),
        });
    }
    layout
});

/// One named sub-histogram of the histogram segment.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    name: String,
    bins: usize,
    min: f32,
    max: f32,
    start: usize,
}

impl HistogramSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Value range `[min, max)` covered by the bins.
    pub fn value_range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Offset of the first bin inside the vector.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Indices of this histogram inside the vector.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.start + self.bins
    }

    /// Column headers, e.g. `A3 (0,0.31415927)`.
    pub fn headers(&self) -> impl Iterator<Item = String> + '_ {
        let (min, max) = self.value_range();
        let step = (max - min) / self.bins as f32;
        (0..self.bins).map(move |i| {
            let lo = min + i as f32 * step;
            let hi = min + (i + 1) as f32 * step;
            format!("{} ({},{})", self.name, lo, hi)
        })
    }
}

/// Scalar segment names plus histogram specs, in vector order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    scalars: Vec<String>,
    histograms: Vec<HistogramSpec>,
}

impl FeatureLayout {
    /// The descriptor layout produced by the mesh sampler: six shape
    /// scalars followed by the A3, D1, D2, D3 and D4 histograms.
    pub fn standard() -> &'static FeatureLayout {
        &STANDARD
    }

    /// Layout with only a scalar segment.
    pub fn with_scalars(scalars: Vec<String>) -> Self {
        Self {
            scalars,
            histograms: Vec::new(),
        }
    }

    /// Append a histogram after everything already in the layout.
    pub fn push_histogram(
        mut self,
        name: impl Into<String>,
        bins: usize,
        min: f32,
        max: f32,
    ) -> Result<Self> {
        if bins == 0 {
            return Err(RetrieveError::InvalidConfiguration(
                "histogram must have at least one bin".to_string(),
            ));
        }
        if !(min < max) {
            return Err(RetrieveError::InvalidConfiguration(format!(
                "histogram range [{min}, {max}) is empty"
            )));
        }
        let start = self.len();
        self.histograms.push(HistogramSpec {
            name: name.into(),
            bins,
            min,
            max,
            start,
        });
        Ok(self)
    }

    /// Total vector length.
    pub fn len(&self) -> usize {
        self.scalars.len() + self.histograms.iter().map(|h| h.bins).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the scalar segment (also the first histogram offset).
    pub fn scalar_count(&self) -> usize {
        self.scalars.len()
    }

    pub fn histograms(&self) -> &[HistogramSpec] {
        &self.histograms
    }

    /// One header per vector component.
    pub fn headers(&self) -> Vec<String> {
        let mut out = self.scalars.clone();
        for h in &self.histograms {
            out.extend(h.headers());
        }
        out
    }

    /// Fail with `LengthMismatch` unless `len` fits this layout.
    pub fn check_len(&self, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(RetrieveError::LengthMismatch {
                expected: self.len(),
                actual: len,
            });
        }
        Ok(())
    }
}
