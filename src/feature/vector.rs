//! Fixed-layout shape descriptor.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use super::layout::{scalar, FeatureLayout};
use crate::error::{Result, RetrieveError};

/// Field separator of the textual record form.
pub const SEPARATOR: char = ';';

/// Shape descriptor: scalar segment followed by histogram bins.
///
/// The values are immutable apart from two in-place steps, each applied at
/// most once: [`histograms_as_percentages`](Self::histograms_as_percentages)
/// and [`normalize`](Self::normalize). Which layout a vector follows is
/// decided by the collection holding it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    data: Vec<f32>,
}

impl FeatureVector {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// All-zero vector of `len` components.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    fn check_len(&self, other: &FeatureVector) -> Result<()> {
        if self.data.len() != other.data.len() {
            return Err(RetrieveError::LengthMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        Ok(())
    }

    /// Elementwise sum.
    pub fn checked_add(&self, other: &FeatureVector) -> Result<FeatureVector> {
        self.check_len(other)?;
        Ok(Self::new(
            self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect(),
        ))
    }

    /// Elementwise difference `self - other`.
    pub fn checked_sub(&self, other: &FeatureVector) -> Result<FeatureVector> {
        self.check_len(other)?;
        Ok(Self::new(
            self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect(),
        ))
    }

    /// Rescale every histogram of `layout` so its bins sum to 1.
    ///
    /// A histogram that received no samples stays all zero.
    pub fn histograms_as_percentages(&mut self, layout: &FeatureLayout) -> Result<()> {
        layout.check_len(self.data.len())?;
        for hist in layout.histograms() {
            let bins = &mut self.data[hist.indices()];
            let total: f32 = bins.iter().sum();
            if total == 0.0 {
                continue;
            }
            for b in bins.iter_mut() {
                *b /= total;
            }
        }
        Ok(())
    }

    /// Z-score in place: `v[i] = (v[i] - avg[i]) / std[i]`.
    ///
    /// Components with `std[i] == 0` are only centered.
    pub fn normalize(&mut self, avg: &FeatureVector, std: &FeatureVector) -> Result<()> {
        self.check_len(avg)?;
        self.check_len(std)?;
        for ((v, &a), &s) in self.data.iter_mut().zip(&avg.data).zip(&std.data) {
            *v -= a;
            if s != 0.0 {
                *v /= s;
            }
        }
        Ok(())
    }

    /// True if any component is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }

    /// Multi-line `header: value` listing.
    pub fn pretty_print(&self, layout: &FeatureLayout) -> String {
        let mut out = String::from("Feature Vector");
        for (name, value) in layout.headers().iter().zip(&self.data) {
            out.push_str(&format!("\n    {name}: {value}"));
        }
        out
    }

    /// Decode a `;`-separated record.
    ///
    /// Degenerate meshes can store an infinite compactness or eccentricity;
    /// those decode as `0`.
    pub fn parse(input: &str) -> Result<Self> {
        let data = input
            .split(SEPARATOR)
            .map(parse_value)
            .collect::<Result<Vec<f32>>>()?;
        let mut v = Self::new(data);
        for idx in [scalar::COMPACTNESS, scalar::ECCENTRICITY] {
            if let Some(x) = v.data.get_mut(idx) {
                if x.is_infinite() {
                    *x = 0.0;
                }
            }
        }
        Ok(v)
    }
}

fn parse_value(field: &str) -> Result<f32> {
    let field = field.trim();
    match field {
        "∞" => return Ok(f32::INFINITY),
        "-∞" => return Ok(f32::NEG_INFINITY),
        _ => {}
    }
    field
        .parse::<f32>()
        .map_err(|e| RetrieveError::parse(0, format!("bad feature value {field:?}: {e}")))
}

impl FromStr for FeatureVector {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tiny_layout() -> FeatureLayout {
        FeatureLayout::with_scalars(vec!["s0".into(), "s1".into()])
            .push_histogram("H1", 3, 0.0, 1.0)
            .unwrap()
            .push_histogram("H2", 2, 0.0, 1.0)
            .unwrap()
    }

    #[test]
    fn add_and_sub_are_elementwise() {
        let a = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let b = FeatureVector::new(vec![0.5, 0.5, 0.5]);
        assert_eq!(a.checked_add(&b).unwrap().as_slice(), &[1.5, 2.5, 3.5]);
        assert_eq!(a.checked_sub(&b).unwrap().as_slice(), &[0.5, 1.5, 2.5]);
    }

    #[test]
    fn arithmetic_rejects_length_mismatch() {
        let a = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let b = FeatureVector::new(vec![1.0, 2.0]);
        assert!(matches!(
            a.checked_add(&b),
            Err(RetrieveError::LengthMismatch { expected: 3, actual: 2 })
        ));
        assert!(a.checked_sub(&b).is_err());
    }

    #[test]
    fn percentages_leave_scalars_and_empty_histograms_alone() {
        let layout = tiny_layout();
        let mut v = FeatureVector::new(vec![7.0, 9.0, 1.0, 1.0, 2.0, 0.0, 0.0]);
        v.histograms_as_percentages(&layout).unwrap();
        assert_eq!(&v.as_slice()[..2], &[7.0, 9.0]);
        assert_relative_eq!(v[2], 0.25);
        assert_relative_eq!(v[3], 0.25);
        assert_relative_eq!(v[4], 0.5);
        assert_eq!(&v.as_slice()[5..], &[0.0, 0.0]);
    }

    #[test]
    fn normalize_skips_zero_deviation() {
        let mut v = FeatureVector::new(vec![3.0, 5.0]);
        let avg = FeatureVector::new(vec![1.0, 2.0]);
        let std = FeatureVector::new(vec![2.0, 0.0]);
        v.normalize(&avg, &std).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 3.0]);
        assert!(!v.has_non_finite());
    }

    #[test]
    fn normalize_rejects_mismatched_statistics() {
        let mut v = FeatureVector::new(vec![3.0, 5.0]);
        let avg = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let std = FeatureVector::new(vec![1.0, 1.0]);
        assert!(v.normalize(&avg, &std).is_err());
    }

    #[test]
    fn parse_repairs_infinite_compactness_and_eccentricity() {
        let v = FeatureVector::parse("1;2;3;inf;-inf;6;inf").unwrap();
        assert_eq!(v[scalar::ECCENTRICITY], 0.0);
        assert_eq!(v[scalar::COMPACTNESS], 0.0);
        // Only the two known-degenerate scalars are repaired.
        assert!(v[6].is_infinite());
    }

    #[test]
    fn parse_accepts_unicode_infinity() {
        let v = FeatureVector::parse("1;2;3;∞;4").unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 0.0, 4.0]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            FeatureVector::parse("1;two;3"),
            Err(RetrieveError::Parse { .. })
        ));
    }

    #[test]
    fn display_round_trips() {
        let v = FeatureVector::new(vec![0.1, -2.5, 1e-7, 3.0]);
        let back: FeatureVector = v.to_string().parse().unwrap();
        assert_eq!(v, back);
    }
}
