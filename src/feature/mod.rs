//! Feature-vector data model.
//!
//! - [`layout`]: scalar segment + named histogram sub-ranges
//! - [`vector`]: the descriptor itself and its two in-place transforms
//! - [`stats`]: per-mesh record wrapping a descriptor

pub mod layout;
pub mod stats;
pub mod vector;

pub use layout::{FeatureLayout, HistogramSpec};
pub use stats::{Aabb, FaceType, MeshStatistics, UNKNOWN_CLASS};
pub use vector::{FeatureVector, SEPARATOR};
