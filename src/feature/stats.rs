//! Per-mesh record: identity, label, summary counts and descriptor.

use std::fmt;
use std::str::FromStr;

use super::vector::{FeatureVector, SEPARATOR};
use crate::error::{Result, RetrieveError};

/// Label of query-only meshes with no known class.
pub const UNKNOWN_CLASS: &str = "?";

/// Number of `;`-separated fields before the feature vector.
pub const RECORD_PREFIX_FIELDS: usize = 11;

/// Kind of faces a mesh is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceType {
    #[default]
    Tris,
    Quads,
    Mixed,
}

impl fmt::Display for FaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaceType::Tris => "Tris",
            FaceType::Quads => "Quads",
            FaceType::Mixed => "Mixed",
        };
        f.write_str(s)
    }
}

impl FromStr for FaceType {
    type Err = RetrieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Tris" => Ok(FaceType::Tris),
            "Quads" => Ok(FaceType::Quads),
            "Mixed" => Ok(FaceType::Mixed),
            other => Err(RetrieveError::parse(0, format!("unknown face type {other:?}"))),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    pub fn volume(&self) -> f32 {
        (0..3).map(|i| self.max[i] - self.min[i]).product()
    }

    pub fn diagonal_length(&self) -> f32 {
        (0..3)
            .map(|i| (self.max[i] - self.min[i]).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One mesh as seen by the retrieval engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshStatistics {
    /// Unique within a database.
    pub id: u32,
    /// Ground-truth class, or [`UNKNOWN_CLASS`].
    pub classification: String,
    pub vertex_count: u32,
    pub face_count: u32,
    pub face_type: FaceType,
    pub bounding_box: Aabb,
    pub features: FeatureVector,
}

impl MeshStatistics {
    pub fn new(id: u32, classification: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            id,
            classification: classification.into(),
            vertex_count: 0,
            face_count: 0,
            face_type: FaceType::default(),
            bounding_box: Aabb::default(),
            features,
        }
    }

    /// Query-only instance: id 0, unknown class.
    pub fn query(features: FeatureVector) -> Self {
        Self::new(0, UNKNOWN_CLASS, features)
    }

    pub fn has_known_class(&self) -> bool {
        self.classification != UNKNOWN_CLASS
    }

    /// Column headers matching the [`Display`](fmt::Display) form.
    pub fn headers(feature_headers: &[String]) -> String {
        let mut cols: Vec<String> = [
            "ID",
            "Class",
            "#Vertices",
            "#Faces",
            "FaceType",
            "AABB_min_X",
            "AABB_min_Y",
            "AABB_min_Z",
            "AABB_max_X",
            "AABB_max_Y",
            "AABB_max_Z",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        cols.extend_from_slice(feature_headers);
        cols.join(";")
    }

    /// Decode one `;`-separated record.
    pub fn parse(input: &str) -> Result<Self> {
        let fields: Vec<&str> = input.splitn(RECORD_PREFIX_FIELDS + 1, SEPARATOR).collect();
        if fields.len() <= RECORD_PREFIX_FIELDS {
            return Err(RetrieveError::parse(
                0,
                format!(
                    "expected at least {} fields, found {}",
                    RECORD_PREFIX_FIELDS + 1,
                    fields.len()
                ),
            ));
        }

        let id = parse_field::<u32>(fields[0], "id")?;
        let mut coords = [0.0f32; 6];
        for (i, c) in coords.iter_mut().enumerate() {
            *c = parse_field(fields[5 + i], "bounding box")?;
        }

        Ok(Self {
            id,
            classification: fields[1].to_string(),
            vertex_count: parse_field(fields[2], "vertex count")?,
            face_count: parse_field(fields[3], "face count")?,
            face_type: fields[4].parse()?,
            bounding_box: Aabb::new(
                [coords[0], coords[1], coords[2]],
                [coords[3], coords[4], coords[5]],
            ),
            features: FeatureVector::parse(fields[RECORD_PREFIX_FIELDS])?,
        })
    }
}

fn parse_field<T: FromStr>(field: &str, what: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    field
        .trim()
        .parse()
        .map_err(|e| RetrieveError::parse(0, format!("bad {what} {field:?}: {e}")))
}

impl fmt::Display for MeshStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bounding_box;
        write!(
            f,
            "{};{};{};{};{};{};{};{};{};{};{};{}",
            self.id,
            self.classification,
            self.vertex_count,
            self.face_count,
            self.face_type,
            b.min[0],
            b.min[1],
            b.min[2],
            b.max[0],
            b.max[1],
            b.max[2],
            self.features
        )
    }
}
