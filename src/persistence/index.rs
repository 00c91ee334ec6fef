//! Cluster index files.
//!
//! The first line names the distance functions the partition was built
//! with (`Euclidean,EarthMovers`). Every following line is one group: the
//! medoid id, then the member ids.
//!
//! ```text
//! Euclidean,EarthMovers
//! 12;12;40;7
//! 3;3;19
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::records::at_line;
use crate::database::FeatureDatabase;
use crate::distance::DistanceConfig;
use crate::error::{Result, RetrieveError};
use crate::feature::SEPARATOR;
use crate::partitioning::ClusterIndex;

pub fn write_index<W: Write>(index: &ClusterIndex, mut w: W) -> Result<()> {
    writeln!(w, "{}", index.config())?;
    for (medoid, members) in index.group_ids() {
        let mut line = medoid.to_string();
        for id in members {
            line.push(SEPARATOR);
            line.push_str(&id.to_string());
        }
        writeln!(w, "{line}")?;
    }
    w.flush()?;
    Ok(())
}

/// Read an index written by [`write_index`], resolving ids against `db`.
///
/// A group line whose member list omits its medoid gets the medoid
/// prepended.
pub fn read_index<R: BufRead>(r: R, db: &FeatureDatabase) -> Result<ClusterIndex> {
    let mut lines = r.lines().enumerate();
    let config = match lines.next() {
        Some((_, header)) => DistanceConfig::parse(header?.trim(), db.layout()).map_err(at_line(1))?,
        None => return Err(RetrieveError::parse(1, "missing distance header")),
    };

    let mut groups = Vec::new();
    for (i, line) in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut ids = line
            .split(SEPARATOR)
            .map(|f| {
                f.trim()
                    .parse::<u32>()
                    .map_err(|e| RetrieveError::parse(i + 1, format!("bad id {f:?}: {e}")))
            })
            .collect::<Result<Vec<u32>>>()?;
        let medoid = ids.remove(0);
        if !ids.contains(&medoid) {
            ids.insert(0, medoid);
        }
        groups.push((medoid, ids));
    }

    debug!(groups = groups.len(), "read cluster index");
    ClusterIndex::from_groups(db, config, groups)
}

pub fn write_index_file(index: &ClusterIndex, path: impl AsRef<Path>) -> Result<()> {
    write_index(index, BufWriter::new(File::create(path)?))
}

pub fn read_index_file(path: impl AsRef<Path>, db: &FeatureDatabase) -> Result<ClusterIndex> {
    read_index(BufReader::new(File::open(path)?), db)
}
