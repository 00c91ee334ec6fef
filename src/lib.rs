//! shapeseek: content-based retrieval over 3D shape descriptors.
//!
//! Every mesh is summarized offline by a fixed-length [`FeatureVector`]:
//! a few global shape scalars followed by normalized histograms of sampled
//! geometric properties. This crate stores those descriptors, normalizes
//! them, compares them, and answers "which shapes look like this one".
//!
//! - `feature/`: descriptor layout, vectors and per-mesh records
//! - `distance`: Euclidean, Cosine, Earth Mover's and their composites
//! - `database`: descriptor collection, statistics, normalization
//! - `partitioning/`: k-medoids cluster index with a shared distance cache
//! - `search`: exhaustive, cluster-routed and external-ANN queries
//! - `evaluation/`: precision / recall / F1 against class labels
//! - `persistence/`: text record files
//!
//! # Critical Nuances
//!
//! ## Histograms and scalars live on different scales
//!
//! Raw histogram bins are sample counts; scalars range from 1e-3 to 1e3.
//! Histograms are turned into percentages once, and then every component
//! is z-scored. Components with zero deviation are only centered.
//!
//! ## Composite distances
//!
//! With two functions the scalar segment and each histogram are scored
//! separately. Each histogram term is divided by its bin count, so a
//! 10-bin histogram weighs about as much as one scalar. Earth Mover's
//! distance is only meaningful on histograms; on the scalar segment it
//! degenerates into a weighted L1.
//!
//! ## Why medoids
//!
//! A centroid of histograms is not a histogram a mesh could produce, and
//! composite distances are not Euclidean. K-medoids only ever compares real
//! items, so every distance configuration is valid for clustering.
//!
//! ## Cluster-routed search is coarse
//!
//! Routed search returns whole groups in medoid order and does not rank
//! inside a group. It trades recall for touching `k` medoids instead of
//! every item.
//!
//! # Example
//!
//! ```
//! use shapeseek::{
//!     search, DistanceConfig, DistanceFunction, FeatureDatabase, FeatureLayout, FeatureVector,
//!     MeshStatistics, SearchLimit,
//! };
//!
//! let layout = FeatureLayout::with_scalars(vec!["x".into()]);
//! let members = vec![
//!     MeshStatistics::new(1, "cup", FeatureVector::new(vec![0.0])),
//!     MeshStatistics::new(2, "cup", FeatureVector::new(vec![1.0])),
//!     MeshStatistics::new(3, "ant", FeatureVector::new(vec![9.0])),
//! ];
//! let db = FeatureDatabase::new(layout, members).unwrap();
//! let config = DistanceConfig::uniform(DistanceFunction::Euclidean);
//!
//! let query = FeatureVector::new(vec![0.4]);
//! let hits = search(&db, &query, SearchLimit::TopK(2), &config).unwrap();
//! assert_eq!(hits[0].item.id, 1);
//! assert_eq!(hits[1].item.id, 2);
//! ```

pub mod ann;
pub mod config;
pub mod database;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod feature;
pub mod partitioning;
pub mod persistence;
pub mod search;

// Re-exports
pub use ann::ExternalAnnIndex;
pub use config::RetrievalConfig;
pub use database::{FeatureDatabase, Statistics};
pub use distance::{DistanceConfig, DistanceFunction};
pub use error::{Result, RetrieveError};
pub use evaluation::{evaluate, ConfusionCounts, EvaluationReport};
pub use feature::{FeatureLayout, FeatureVector, MeshStatistics};
pub use partitioning::{ClusterIndex, ClusterParams};
pub use search::{search, search_via_ann, search_via_index, Match, SearchLimit};
