//! Leave-one-in retrieval evaluation against ground-truth labels.
//!
//! Every labelled member is used as a query against the whole database
//! (itself included, so it always comes back at distance zero under
//! exhaustive search). Members without a class label are never queried,
//! but can still be returned as false positives. The labels of the returned items are turned into confusion
//! counts relative to the query's class, summed per class and overall.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use super::metrics::ConfusionCounts;
use crate::database::FeatureDatabase;
use crate::distance::DistanceConfig;
use crate::error::{Result, RetrieveError};
use crate::partitioning::ClusterIndex;
use crate::search::{search, search_via_index, SearchLimit, DEFAULT_K};

/// Which search answers the self-queries.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    /// Exhaustive ranked search with this distance configuration.
    Exhaustive(&'a DistanceConfig),
    /// Cluster-routed search over a built index.
    ClusterRouted(&'a ClusterIndex),
}

/// Number of results requested per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySize {
    /// Same `k` for every query.
    Fixed(usize),
    /// `k` = size of the query's own class.
    FirstTier,
}

/// Summed confusion counts per class and overall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub per_class: BTreeMap<String, ConfusionCounts>,
    pub total: ConfusionCounts,
    /// Number of queries run.
    pub queries: usize,
}

impl EvaluationReport {
    /// Classes ordered by descending F1, ties by name.
    pub fn ranked_classes(&self) -> Vec<(&str, &ConfusionCounts)> {
        let mut classes: Vec<(&str, &ConfusionCounts)> =
            self.per_class.iter().map(|(c, counts)| (c.as_str(), counts)).collect();
        classes.sort_by(|a, b| b.1.f1().total_cmp(&a.1.f1()).then_with(|| a.0.cmp(b.0)));
        classes
    }

    /// Metric table: the aggregate row first, then one row per class.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{:<24} {:>9} {:>9} {:>9} {:>9} {:>11}",
            "class", "precision", "recall", "accuracy", "f1", "specificity"
        );
        let mut row = |name: &str, c: &ConfusionCounts| {
            out.push_str(&format!(
                "\n{:<24} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>11.3}",
                name,
                c.precision(),
                c.recall(),
                c.accuracy(),
                c.f1(),
                c.specificity()
            ));
        };
        row("total", &self.total);
        for (name, counts) in self.ranked_classes() {
            row(name, counts);
        }
        out
    }
}

/// Evaluate exhaustive search: first-tier sizing, or the default `k`.
pub fn evaluate(db: &FeatureDatabase, config: &DistanceConfig, first_tier: bool) -> Result<EvaluationReport> {
    let size = if first_tier {
        QuerySize::FirstTier
    } else {
        QuerySize::Fixed(DEFAULT_K)
    };
    evaluate_with(db, Strategy::Exhaustive(config), size)
}

/// Self-query every member of `db` with `strategy`.
pub fn evaluate_with(
    db: &FeatureDatabase,
    strategy: Strategy<'_>,
    size: QuerySize,
) -> Result<EvaluationReport> {
    if db.is_empty() {
        return Err(RetrieveError::EmptyDatabase);
    }
    let n = db.len();
    let class_sizes = db.class_sizes();

    let skipped = db.iter().filter(|m| !m.has_known_class()).count();
    if skipped > 0 {
        debug!(skipped, "members without a class label are not queried");
    }

    let per_query: Vec<(&str, ConfusionCounts)> = db
        .members()
        .par_iter()
        .filter(|m| m.has_known_class())
        .map(|m| {
            let class = m.classification.as_str();
            let class_size = class_sizes.get(class).copied().unwrap_or(0);
            let k = match size {
                QuerySize::Fixed(k) => k,
                QuerySize::FirstTier => class_size,
            };
            debug!(id = m.id, k, "evaluating query");

            let counts = match strategy {
                Strategy::Exhaustive(config) => {
                    let found = search(db, &m.features, SearchLimit::TopK(k), config)?;
                    ConfusionCounts::from_query(
                        class,
                        found.iter().map(|r| r.item.classification.as_str()),
                        class_size,
                        n,
                    )
                }
                Strategy::ClusterRouted(index) => {
                    let found = search_via_index(index, &m.features, k)?;
                    ConfusionCounts::from_query(
                        class,
                        found.iter().map(|r| r.classification.as_str()),
                        class_size,
                        n,
                    )
                }
            };
            Ok((class, counts))
        })
        .collect::<Result<_>>()?;

    let mut report = EvaluationReport {
        queries: per_query.len(),
        ..EvaluationReport::default()
    };
    for (class, counts) in per_query {
        *report.per_class.entry(class.to_string()).or_default() += counts;
        report.total += counts;
    }

    info!(
        queries = report.queries,
        classes = report.per_class.len(),
        precision = report.total.precision(),
        recall = report.total.recall(),
        "evaluation finished"
    );
    Ok(report)
}
