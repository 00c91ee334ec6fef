//! Confusion counts and the ratios derived from them.
//!
//! | Metric | Formula |
//! |--------|---------|
//! | Precision | TP / (TP + FP) |
//! | Recall | TP / (TP + FN) |
//! | Accuracy | (TP + TN) / (TP + FN + FP + TN) |
//! | F1 | 2 · P · R / (P + R) |
//! | Specificity | TN / (FP + TN) |
//!
//! Counts are summed across queries before any ratio is taken. A ratio with
//! a zero denominator is reported as `0.0`.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// True/false positive/negative counts relative to one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionCounts {
    /// Counts for one query of class `class` that returned `labels`.
    ///
    /// `class_size` is the number of database members labelled `class` and
    /// `total` the database size.
    pub fn from_query<'a, I>(class: &str, labels: I, class_size: usize, total: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tp = 0;
        let mut fp = 0;
        for label in labels {
            if label == class {
                tp += 1;
            } else {
                fp += 1;
            }
        }
        Self {
            true_positives: tp,
            false_positives: fp,
            false_negatives: class_size.saturating_sub(tp),
            true_negatives: total.saturating_sub(class_size).saturating_sub(fp),
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.false_positives + self.true_negatives)
    }
}

impl Add for ConfusionCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            true_positives: self.true_positives + rhs.true_positives,
            false_positives: self.false_positives + rhs.false_positives,
            false_negatives: self.false_negatives + rhs.false_negatives,
            true_negatives: self.true_negatives + rhs.true_negatives,
        }
    }
}

impl AddAssign for ConfusionCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ConfusionCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
