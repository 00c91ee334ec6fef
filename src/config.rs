//! Serializable retrieval settings.
//!
//! ```
//! use shapeseek::config::RetrievalConfig;
//! use shapeseek::search::SearchLimit;
//!
//! let cfg = RetrievalConfig::from_json_str(r#"{ "k": 10, "clusters": 20 }"#).unwrap();
//! assert_eq!(cfg.search_limit().unwrap(), SearchLimit::TopK(10));
//! assert_eq!(cfg.cluster_params().k, 20);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::{DistanceConfig, DistanceFunction};
use crate::error::{Result, RetrieveError};
use crate::feature::FeatureLayout;
use crate::partitioning::ClusterParams;
use crate::search::SearchLimit;

/// Everything a retrieval session needs besides the data.
///
/// Missing JSON fields take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// One function for the whole vector, or scalar then histogram.
    pub functions: Vec<DistanceFunction>,
    /// Number of results; exclusive with `threshold`.
    pub k: Option<usize>,
    /// Inclusive distance cutoff; exclusive with `k`.
    pub threshold: Option<f32>,
    /// Number of medoid groups for the cluster index.
    pub clusters: usize,
    pub max_iterations: usize,
    /// Seed for the first medoid; item 0 when unset.
    pub seed: Option<u64>,
    /// Evaluate with `k` equal to the query's class size.
    pub first_tier: bool,
    /// Log every dropped database member.
    pub verbose: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let cluster = ClusterParams::default();
        Self {
            functions: vec![DistanceFunction::Euclidean, DistanceFunction::EarthMovers],
            k: None,
            threshold: None,
            clusters: cluster.k,
            max_iterations: cluster.max_iterations,
            seed: cluster.seed,
            first_tier: false,
            verbose: false,
        }
    }
}

impl RetrievalConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Composite distance over `layout`.
    pub fn distance_config(&self, layout: &FeatureLayout) -> Result<DistanceConfig> {
        DistanceConfig::new(&self.functions, layout)
    }

    pub fn search_limit(&self) -> Result<SearchLimit> {
        SearchLimit::from_options(self.k, self.threshold)
    }

    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            k: self.clusters,
            max_iterations: self.max_iterations,
            seed: self.seed,
        }
    }

    /// Check every derived setting against `layout` at once.
    pub fn validate(&self, layout: &FeatureLayout) -> Result<()> {
        self.distance_config(layout)?;
        self.search_limit()?;
        if self.clusters == 0 {
            return Err(RetrieveError::InvalidConfiguration(
                "clusters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
