//! Ordered collection of mesh descriptors with population statistics.
//!
//! Aggregate statistics are recomputed by every operation that changes the
//! member set, so they always describe the current members. The parameters
//! actually used for z-scoring are kept separately: they stay valid for
//! normalizing new query vectors after the members themselves have been
//! transformed or filtered.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, RetrieveError};
use crate::feature::{FeatureLayout, FeatureVector, MeshStatistics};

/// Componentwise mean and sample standard deviation (divisor `n - 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub average: FeatureVector,
    pub std_dev: FeatureVector,
}

impl Statistics {
    /// Statistics of `members`, or `None` when there are none.
    ///
    /// With a single member every deviation is zero.
    pub fn compute<'a, I>(members: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MeshStatistics>,
        I::IntoIter: Clone,
    {
        let members = members.into_iter();
        let first = members.clone().next()?;
        let dim = first.features.len();
        let n = members.clone().count();

        let mut sum = vec![0.0f64; dim];
        for m in members.clone() {
            for (s, &v) in sum.iter_mut().zip(m.features.as_slice()) {
                *s += f64::from(v);
            }
        }
        let mean: Vec<f64> = sum.iter().map(|s| s / n as f64).collect();

        let mut squares = vec![0.0f64; dim];
        for m in members {
            for ((sq, &v), mu) in squares.iter_mut().zip(m.features.as_slice()).zip(&mean) {
                let d = f64::from(v) - mu;
                *sq += d * d;
            }
        }
        let std_dev: Vec<f32> = if n > 1 {
            squares
                .iter()
                .map(|sq| (sq / (n - 1) as f64).sqrt() as f32)
                .collect()
        } else {
            vec![0.0; dim]
        };

        Some(Self {
            average: FeatureVector::new(mean.iter().map(|&m| m as f32).collect()),
            std_dev: FeatureVector::new(std_dev),
        })
    }
}

/// Ordered set of [`MeshStatistics`] sharing one [`FeatureLayout`].
#[derive(Debug, Clone)]
pub struct FeatureDatabase {
    layout: FeatureLayout,
    members: Vec<MeshStatistics>,
    statistics: Option<Statistics>,
    percentages: bool,
    normalization: Option<Statistics>,
}

impl FeatureDatabase {
    /// Database of raw (not yet percentage-encoded) descriptors.
    ///
    /// Fails if a member does not fit `layout` or two members share an id.
    pub fn new(layout: FeatureLayout, members: Vec<MeshStatistics>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(members.len());
        for m in &members {
            layout.check_len(m.features.len())?;
            if !seen.insert(m.id) {
                return Err(RetrieveError::DuplicateId { id: m.id });
            }
        }
        let statistics = Statistics::compute(&members);
        Ok(Self {
            layout,
            members,
            statistics,
            percentages: false,
            normalization: None,
        })
    }

    /// Database whose members were already normalized with `params`.
    pub fn normalized(
        layout: FeatureLayout,
        members: Vec<MeshStatistics>,
        params: Statistics,
    ) -> Result<Self> {
        layout.check_len(params.average.len())?;
        layout.check_len(params.std_dev.len())?;
        let mut db = Self::new(layout, members)?;
        db.percentages = true;
        db.normalization = Some(params);
        Ok(db)
    }

    /// Mark the members' histograms as already percentage-encoded.
    #[must_use]
    pub fn with_percentages(mut self) -> Self {
        self.percentages = true;
        self
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[MeshStatistics] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeshStatistics> {
        self.members.iter()
    }

    pub fn get(&self, id: u32) -> Option<&MeshStatistics> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Mean and sample std-dev of the current members.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    pub fn average(&self) -> Option<&FeatureVector> {
        self.statistics.as_ref().map(|s| &s.average)
    }

    pub fn standard_dev(&self) -> Option<&FeatureVector> {
        self.statistics.as_ref().map(|s| &s.std_dev)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalization.is_some()
    }

    /// Parameters the members were normalized with.
    pub fn normalization(&self) -> Option<&Statistics> {
        self.normalization.as_ref()
    }

    fn refresh(&mut self) {
        self.statistics = Statistics::compute(&self.members);
    }

    /// Append a member.
    pub fn push(&mut self, member: MeshStatistics) -> Result<()> {
        self.layout.check_len(member.features.len())?;
        if self.get(member.id).is_some() {
            return Err(RetrieveError::DuplicateId { id: member.id });
        }
        self.members.push(member);
        self.refresh();
        Ok(())
    }

    /// Keep only members whose id is in `ids`. Returns how many were removed.
    pub fn filter(&mut self, ids: &HashSet<u32>) -> usize {
        let before = self.members.len();
        self.members.retain(|m| ids.contains(&m.id));
        let removed = before - self.members.len();
        if removed > 0 {
            debug!(removed, remaining = self.members.len(), "filtered feature database");
        }
        self.refresh();
        removed
    }

    /// Drop members holding NaN or infinite values. Returns the dropped ids.
    ///
    /// Degenerate meshes produce these occasionally; each one is reported
    /// and the rest of the database stays usable.
    pub fn filter_nan_and_inf(&mut self, verbose: bool) -> Vec<u32> {
        let layout = &self.layout;
        let mut dropped = Vec::new();
        self.members.retain(|m| {
            if !m.features.has_non_finite() {
                return true;
            }
            let err = RetrieveError::InvalidFeatureValue { id: m.id };
            if verbose {
                warn!(id = m.id, "{err}, removing it\n{}", m.features.pretty_print(layout));
            } else {
                warn!(id = m.id, "{err}, removing it");
            }
            dropped.push(m.id);
            false
        });
        if !dropped.is_empty() {
            info!(
                removed = dropped.len(),
                remaining = self.members.len(),
                "removed feature vectors with NaN or infinite values"
            );
        }
        self.refresh();
        dropped
    }

    /// Percentage-encode histograms (once), then z-score every member with
    /// the mean and std-dev of the current membership.
    ///
    /// Members holding NaN or infinite values do not contribute to the
    /// parameters; they stay in the database for
    /// [`filter_nan_and_inf`](Self::filter_nan_and_inf) to report and drop.
    pub fn normalize(&mut self) -> Result<()> {
        if self.is_normalized() {
            return Err(RetrieveError::AlreadyNormalized);
        }
        if self.members.is_empty() {
            return Err(RetrieveError::EmptyDatabase);
        }

        let layout = &self.layout;
        if !self.percentages {
            self.members
                .par_iter_mut()
                .try_for_each(|m| m.features.histograms_as_percentages(layout))?;
            self.percentages = true;
        }

        // Non-finite members are left for `filter_nan_and_inf` and must not
        // leak into the parameters every other member is scaled with.
        let finite = self.members.iter().filter(|m| !m.features.has_non_finite());
        let skipped = self.members.len() - finite.clone().count();
        if skipped > 0 {
            debug!(skipped, "non-finite members excluded from normalization parameters");
        }
        let params = Statistics::compute(finite).ok_or(RetrieveError::EmptyDatabase)?;
        self.members
            .par_iter_mut()
            .try_for_each(|m| m.features.normalize(&params.average, &params.std_dev))?;

        let zero_variance = params.std_dev.as_slice().iter().filter(|&&s| s == 0.0).count();
        if zero_variance > 0 {
            debug!(zero_variance, "components with zero deviation were only centered");
        }
        info!(members = self.members.len(), "normalized feature database");

        self.normalization = Some(params);
        self.refresh();
        Ok(())
    }

    /// Bring an external query vector into this database's feature space.
    pub fn normalize_query(&self, mut query: FeatureVector) -> Result<FeatureVector> {
        let params = self.normalization.as_ref().ok_or_else(|| {
            RetrieveError::InvalidConfiguration("feature database is not normalized".to_string())
        })?;
        query.histograms_as_percentages(&self.layout)?;
        query.normalize(&params.average, &params.std_dev)?;
        Ok(query)
    }

    /// Set every member's label from `classes`.
    ///
    /// Nothing is changed if any member id has no label.
    pub fn assign_classes(&mut self, classes: &HashMap<u32, String>) -> Result<()> {
        if let Some(m) = self.members.iter().find(|m| !classes.contains_key(&m.id)) {
            return Err(RetrieveError::MissingClassification { id: m.id });
        }
        for m in &mut self.members {
            if let Some(c) = classes.get(&m.id) {
                m.classification.clone_from(c);
            }
        }
        Ok(())
    }

    /// Number of members per class label.
    pub fn class_sizes(&self) -> HashMap<String, usize> {
        let mut sizes = HashMap::new();
        for m in &self.members {
            *sizes.entry(m.classification.clone()).or_insert(0) += 1;
        }
        sizes
    }

    /// Row-major `count x dimension` copy of all descriptors.
    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.members.len() * self.layout.len());
        for m in &self.members {
            out.extend_from_slice(m.features.as_slice());
        }
        out
    }
}
