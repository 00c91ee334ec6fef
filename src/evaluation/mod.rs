//! Retrieval-quality evaluation against ground-truth class labels.
//!
//! - [`metrics`]: confusion counts and derived ratios
//! - [`harness`]: leave-one-in self-query driver

pub mod harness;
pub mod metrics;

pub use harness::{evaluate, evaluate_with, EvaluationReport, QuerySize, Strategy};
pub use metrics::ConfusionCounts;
