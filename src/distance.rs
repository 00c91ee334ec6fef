//! Distance engine for feature vectors.
//!
//! Three kernels operate over a sub-range of two vectors:
//!
//! | Function | Formula |
//! |----------|---------|
//! | Euclidean | $\sqrt{\sum (a_i - b_i)^2}$ |
//! | Cosine | $1 - \frac{\sum a_i b_i}{\sqrt{\sum a_i^2 \sum b_i^2}}$ |
//! | EarthMovers | $\sum_i \lvert c_i \rvert$, $c_i = \sum_{j \le i} (a_j - b_j)$ |
//!
//! A [`DistanceConfig`] composes them. With one function it covers the whole
//! vector. With two, the first covers the scalar segment and the second is
//! applied to every histogram separately, each histogram's contribution
//! divided by its bin count so wide histograms do not dominate.
//!
//! ## Important nuance
//!
//! Only EarthMovers treats the bins as an ordered distribution. Using it on
//! the scalar segment is allowed but rarely meaningful.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrieveError};
use crate::feature::{FeatureLayout, FeatureVector};

/// Distance kernel over a sub-range of two vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceFunction {
    /// Root of summed squared differences.
    Euclidean,
    /// $1 - \cos(a,b)$.
    Cosine,
    /// Discrete 1-D Earth Mover's distance.
    EarthMovers,
}

impl DistanceFunction {
    pub const ALL: [DistanceFunction; 3] = [
        DistanceFunction::Euclidean,
        DistanceFunction::Cosine,
        DistanceFunction::EarthMovers,
    ];

    /// Distance between two equally long slices.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceFunction::Euclidean => euclidean_distance(a, b),
            DistanceFunction::Cosine => cosine_distance(a, b),
            DistanceFunction::EarthMovers => earth_movers_distance(a, b),
        }
    }
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DistanceFunction::Euclidean => "Euclidean",
            DistanceFunction::Cosine => "Cosine",
            DistanceFunction::EarthMovers => "EarthMovers",
        };
        f.write_str(s)
    }
}

impl FromStr for DistanceFunction {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceFunction::Euclidean),
            "cosine" => Ok(DistanceFunction::Cosine),
            "earthmovers" | "emd" => Ok(DistanceFunction::EarthMovers),
            other => Err(RetrieveError::InvalidConfiguration(format!(
                "unknown distance function {other:?}"
            ))),
        }
    }
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Cosine distance $1 - \cos(a,b)$.
///
/// Two all-zero ranges are identical (distance 0); a zero range against a
/// non-zero one is at distance 1.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return if norm_a == norm_b { 0.0 } else { 1.0 };
    }
    1.0 - (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0)
}

/// Discrete 1-D Earth Mover's distance over ordered bins.
#[inline]
#[must_use]
pub fn earth_movers_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut carried = 0.0f32;
    let mut work = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        carried += x - y;
        work += carried.abs();
    }
    work
}

#[derive(Debug, Clone, PartialEq)]
enum Composite {
    Uniform(DistanceFunction),
    Split {
        scalar: DistanceFunction,
        histogram: DistanceFunction,
        layout: FeatureLayout,
    },
}

/// Composite distance: one function over the whole vector, or a
/// scalar-segment function plus a per-histogram function.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConfig {
    composite: Composite,
}

impl DistanceConfig {
    /// Build from one or two functions.
    ///
    /// `layout` is only consulted for two functions.
    pub fn new(functions: &[DistanceFunction], layout: &FeatureLayout) -> Result<Self> {
        match functions {
            [f] => Ok(Self::uniform(*f)),
            [scalar, histogram] => Ok(Self::split(*scalar, *histogram, layout.clone())),
            _ => Err(RetrieveError::InvalidConfiguration(format!(
                "distance configuration needs 1 or 2 functions, got {}",
                functions.len()
            ))),
        }
    }

    pub fn uniform(function: DistanceFunction) -> Self {
        Self {
            composite: Composite::Uniform(function),
        }
    }

    pub fn split(scalar: DistanceFunction, histogram: DistanceFunction, layout: FeatureLayout) -> Self {
        Self {
            composite: Composite::Split {
                scalar,
                histogram,
                layout,
            },
        }
    }

    /// Functions in configuration order.
    pub fn functions(&self) -> Vec<DistanceFunction> {
        match &self.composite {
            Composite::Uniform(f) => vec![*f],
            Composite::Split {
                scalar, histogram, ..
            } => vec![*scalar, *histogram],
        }
    }

    /// Total distance between two vectors.
    pub fn distance(&self, a: &FeatureVector, b: &FeatureVector) -> Result<f32> {
        if a.len() != b.len() {
            return Err(RetrieveError::LengthMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        let (a, b) = (a.as_slice(), b.as_slice());
        match &self.composite {
            Composite::Uniform(f) => Ok(f.distance(a, b)),
            Composite::Split {
                scalar,
                histogram,
                layout,
            } => {
                layout.check_len(a.len())?;
                let s = layout.scalar_count();
                let mut total = scalar.distance(&a[..s], &b[..s]);
                for h in layout.histograms() {
                    let r = h.indices();
                    total += histogram.distance(&a[r.clone()], &b[r]) / h.bins() as f32;
                }
                Ok(total)
            }
        }
    }

    /// Parse the `Euclidean,EarthMovers` form written by [`Display`](fmt::Display).
    pub fn parse(input: &str, layout: &FeatureLayout) -> Result<Self> {
        let functions = input
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<DistanceFunction>>>()?;
        Self::new(&functions, layout)
    }
}

impl fmt::Display for DistanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.functions().iter().map(|x| x.to_string()).collect();
        f.write_str(&names.join(","))
    }
}
