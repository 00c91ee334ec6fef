//! Plain-text persistence.
//!
//! Every file is UTF-8, one `;`-separated record per line, with a header
//! line first.
//!
//! - [`records`]: feature databases, class labels, mesh-id discovery
//! - [`index`]: cluster partitions

pub mod index;
pub mod records;

pub use index::{read_index, read_index_file, write_index, write_index_file};
pub use records::{
    list_mesh_ids, mesh_id_from_path, read_classification, read_classification_file, read_database,
    read_database_file, write_classification, write_database, write_database_file,
};
