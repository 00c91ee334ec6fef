//! Hand-off to an external approximate-nearest-neighbour index.
//!
//! The engine does not ship a native ANN structure. A plugin (for example a
//! k-d tree behind a foreign binding) receives every descriptor as one
//! flattened buffer and answers queries with row positions; the engine then
//! re-scores those candidates with its own distance configuration, see
//! [`crate::search::search_via_ann`].

pub mod traits;

pub use traits::{build_external, ExternalAnnIndex};
