//! Feature database and classification files.
//!
//! A database file is one header line, optionally two normalization records
//! (`Average;…` and `StandardDev;…`), then one mesh record per line:
//!
//! ```text
//! ID;Class;#Vertices;#Faces;FaceType;AABB_min_X;…;AABB_max_Z;AABB_Volume;…
//! Average;0.41;…
//! StandardDev;0.12;…
//! 17;chair;2048;4092;Tris;-0.5;…
//! ```
//!
//! The normalization records mark the file as already normalized.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::database::{FeatureDatabase, Statistics};
use crate::error::{Result, RetrieveError};
use crate::feature::{FeatureLayout, FeatureVector, MeshStatistics};

const AVERAGE_TAG: &str = "Average;";
const STD_DEV_TAG: &str = "StandardDev;";

/// Put a 1-based line number on a parse error raised by a record decoder.
pub(crate) fn at_line(line: usize) -> impl FnOnce(RetrieveError) -> RetrieveError {
    move |e| match e {
        RetrieveError::Parse { message, .. } => RetrieveError::Parse { line, message },
        other => other,
    }
}

/// Write `db` with members ordered by id.
pub fn write_database<W: Write>(db: &FeatureDatabase, mut w: W) -> Result<()> {
    writeln!(w, "{}", MeshStatistics::headers(&db.layout().headers()))?;
    if let Some(params) = db.normalization() {
        writeln!(w, "{AVERAGE_TAG}{}", params.average)?;
        writeln!(w, "{STD_DEV_TAG}{}", params.std_dev)?;
    }
    let mut members: Vec<&MeshStatistics> = db.iter().collect();
    members.sort_by_key(|m| m.id);
    for m in members {
        writeln!(w, "{m}")?;
    }
    w.flush()?;
    Ok(())
}

/// Read a database written by [`write_database`].
pub fn read_database<R: BufRead>(r: R, layout: &FeatureLayout) -> Result<FeatureDatabase> {
    let mut average = None;
    let mut std_dev = None;
    let mut members = Vec::new();

    for (i, line) in r.lines().enumerate().skip(1) {
        let line = line?;
        let line_no = i + 1;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(AVERAGE_TAG) {
            average = Some(FeatureVector::parse(rest).map_err(at_line(line_no))?);
        } else if let Some(rest) = line.strip_prefix(STD_DEV_TAG) {
            std_dev = Some(FeatureVector::parse(rest).map_err(at_line(line_no))?);
        } else {
            members.push(MeshStatistics::parse(line).map_err(at_line(line_no))?);
        }
    }

    debug!(members = members.len(), normalized = average.is_some(), "read feature database");
    match (average, std_dev) {
        (Some(average), Some(std_dev)) => {
            FeatureDatabase::normalized(layout.clone(), members, Statistics { average, std_dev })
        }
        (None, None) => FeatureDatabase::new(layout.clone(), members),
        _ => Err(RetrieveError::parse(
            0,
            "normalization needs both an Average and a StandardDev record",
        )),
    }
}

pub fn write_database_file(db: &FeatureDatabase, path: impl AsRef<Path>) -> Result<()> {
    write_database(db, BufWriter::new(File::create(path)?))
}

pub fn read_database_file(path: impl AsRef<Path>, layout: &FeatureLayout) -> Result<FeatureDatabase> {
    read_database(BufReader::new(File::open(path)?), layout)
}

/// Read `id;class` label records (first line is a header).
pub fn read_classification<R: BufRead>(r: R) -> Result<HashMap<u32, String>> {
    let mut classes = HashMap::new();
    for (i, line) in r.lines().enumerate().skip(1) {
        let line = line?;
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(';');
        let id = fields
            .next()
            .unwrap_or_default()
            .trim()
            .parse::<u32>()
            .map_err(|e| RetrieveError::parse(line_no, format!("bad id: {e}")))?;
        let class = fields
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RetrieveError::parse(line_no, "missing class"))?;
        if classes.insert(id, class.to_string()).is_some() {
            return Err(RetrieveError::DuplicateId { id });
        }
    }
    Ok(classes)
}

pub fn read_classification_file(path: impl AsRef<Path>) -> Result<HashMap<u32, String>> {
    read_classification(BufReader::new(File::open(path)?))
}

/// Write `id;class` records ordered by id.
pub fn write_classification<W: Write>(classes: &HashMap<u32, String>, mut w: W) -> Result<()> {
    writeln!(w, "ID;Class")?;
    let mut ids: Vec<&u32> = classes.keys().collect();
    ids.sort();
    for id in ids {
        writeln!(w, "{id};{}", classes[id])?;
    }
    w.flush()?;
    Ok(())
}

/// Mesh id encoded in a file name: `m123.off` and `123.ply` are both 123.
pub fn mesh_id_from_path(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .trim_start_matches('m')
        .parse()
        .ok()
}

/// Ids of all mesh files below `dir`, for [`FeatureDatabase::filter`].
///
/// Feature files (`.mr`), editor backups (`~`) and names without a numeric
/// id are ignored.
pub fn list_mesh_ids(dir: impl AsRef<Path>) -> Result<HashSet<u32>> {
    let mut ids = HashSet::new();
    let mut pending = vec![dir.as_ref().to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = path.to_string_lossy();
            if name.ends_with('~') || path.extension().is_some_and(|e| e == "mr") {
                continue;
            }
            match mesh_id_from_path(&path) {
                Some(id) => {
                    ids.insert(id);
                }
                None => debug!(path = %path.display(), "skipping file without mesh id"),
            }
        }
    }
    Ok(ids)
}
