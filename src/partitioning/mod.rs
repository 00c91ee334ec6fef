//! Partition-based index for approximate search.
//!
//! - [`kmedoids`]: K-medoids (PAM-style) clustering index
//! - [`cache`]: pairwise-distance cache shared by one build

pub mod cache;
pub mod kmedoids;

pub use cache::DistanceCache;
pub use kmedoids::{ClusterGroup, ClusterIndex, ClusterNode, ClusterParams};
