//! K-medoids (PAM-style) clustering index.
//!
//! Every group is represented by one of its own items (the medoid), never by
//! a synthetic centroid, so any distance configuration works, including
//! non-Euclidean composites.
//!
//! Nodes live in an arena indexed by position. A node records the index of
//! its group; a group records the node index of its medoid and its member
//! list. Moving a node is two index updates.
//!
//! # Build
//!
//! 1. Fail with `InsufficientItems` if there are fewer items than `k`.
//! 2. Seed: first medoid is item 0 (or a seeded random item), then
//!    repeatedly the item whose distance to its nearest medoid is largest.
//! 3. Assign every item to its nearest medoid.
//! 4. Until a full pass changes nothing: move each medoid to the member with
//!    the smallest summed in-group distance, then move each item to its
//!    nearest medoid.
//!
//! Pairwise distances go through a [`DistanceCache`]; each pair is computed
//! about once per build, which dominates build cost.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::cache::DistanceCache;
use crate::database::FeatureDatabase;
use crate::distance::DistanceConfig;
use crate::error::{Result, RetrieveError};
use crate::feature::MeshStatistics;

/// Clustering parameters.
#[derive(Clone, Debug)]
pub struct ClusterParams {
    /// Number of groups.
    pub k: usize,

    /// Upper bound on refinement passes; reaching it is logged.
    pub max_iterations: usize,

    /// Pick the first medoid at random with this seed instead of item 0.
    pub seed: Option<u64>,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 300,
            seed: None,
        }
    }
}

impl ClusterParams {
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// One clustered item and the group it currently belongs to.
#[derive(Debug, Clone)]
pub struct ClusterNode {
    mesh: MeshStatistics,
    group: usize,
}

impl ClusterNode {
    pub fn mesh(&self) -> &MeshStatistics {
        &self.mesh
    }

    pub fn group(&self) -> usize {
        self.group
    }
}

/// A medoid and its members (node indices, medoid included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterGroup {
    center: usize,
    members: Vec<usize>,
}

impl ClusterGroup {
    /// Node index of the medoid.
    pub fn center(&self) -> usize {
        self.center
    }

    /// Node indices in membership order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Cached distance lookups between arena nodes.
struct PairDistance<'a> {
    meshes: &'a [MeshStatistics],
    config: &'a DistanceConfig,
    cache: &'a DistanceCache,
}

impl PairDistance<'_> {
    fn between(&self, a: usize, b: usize) -> Result<f32> {
        if a == b {
            return Ok(0.0);
        }
        let (ma, mb) = (&self.meshes[a], &self.meshes[b]);
        self.cache
            .get_or_compute(ma.id, mb.id, || self.config.distance(&ma.features, &mb.features))
    }

    /// Group whose medoid is nearest to `node`; the first group wins ties.
    fn nearest(&self, node: usize, centers: &[usize]) -> Result<usize> {
        let mut best = 0;
        let mut best_d = f32::INFINITY;
        for (g, &c) in centers.iter().enumerate() {
            let d = self.between(node, c)?;
            if d < best_d {
                best = g;
                best_d = d;
            }
        }
        Ok(best)
    }

    /// Like [`nearest`](Self::nearest) but stays in `current` unless another
    /// medoid is strictly closer. A medoid never leaves its own group.
    fn reassign(&self, node: usize, current: usize, centers: &[usize]) -> Result<usize> {
        if centers[current] == node {
            return Ok(current);
        }
        let mut best = current;
        let mut best_d = self.between(node, centers[current])?;
        for (g, &c) in centers.iter().enumerate() {
            if g == current {
                continue;
            }
            let d = self.between(node, c)?;
            if d < best_d {
                best = g;
                best_d = d;
            }
        }
        Ok(best)
    }

    /// Member with the smallest summed distance to the rest of the group.
    /// The current medoid is kept when it is among the minimizers.
    fn best_center(&self, group: &ClusterGroup) -> Result<usize> {
        let cost = |m: usize| -> Result<f32> {
            group
                .members
                .iter()
                .map(|&o| self.between(m, o))
                .sum::<Result<f32>>()
        };
        let mut best = group.center;
        let mut best_cost = cost(group.center)?;
        for &m in &group.members {
            if m == group.center {
                continue;
            }
            let c = cost(m)?;
            if c < best_cost {
                best = m;
                best_cost = c;
            }
        }
        Ok(best)
    }
}

/// K-medoids partition of a database snapshot.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    config: DistanceConfig,
    nodes: Vec<ClusterNode>,
    groups: Vec<ClusterGroup>,
    iterations: usize,
    cached_pairs: usize,
    distance_computations: usize,
}

impl ClusterIndex {
    /// Cluster a snapshot of `db`.
    pub fn build(db: &FeatureDatabase, config: DistanceConfig, params: &ClusterParams) -> Result<Self> {
        Self::build_from(db.members().to_vec(), config, params)
    }

    /// Cluster `items` (ids must be unique).
    pub fn build_from(
        items: Vec<MeshStatistics>,
        config: DistanceConfig,
        params: &ClusterParams,
    ) -> Result<Self> {
        let n = items.len();
        let k = params.k;
        if k == 0 {
            return Err(RetrieveError::InvalidConfiguration(
                "cluster count must be greater than 0".to_string(),
            ));
        }
        if n < k {
            return Err(RetrieveError::InsufficientItems { items: n, k });
        }
        let mut seen = HashSet::with_capacity(n);
        for m in &items {
            if !seen.insert(m.id) {
                return Err(RetrieveError::DuplicateId { id: m.id });
            }
        }

        let cache = DistanceCache::with_capacity(n * k);
        let dist = PairDistance {
            meshes: &items,
            config: &config,
            cache: &cache,
        };

        let centers = seed_medoids(&dist, n, k, params.seed)?;
        let mut groups: Vec<ClusterGroup> = centers
            .iter()
            .map(|&c| ClusterGroup {
                center: c,
                members: Vec::new(),
            })
            .collect();

        let mut group_of: Vec<usize> = (0..n)
            .into_par_iter()
            .map(|i| match centers.iter().position(|&c| c == i) {
                Some(g) => Ok(g),
                None => dist.nearest(i, &centers),
            })
            .collect::<Result<_>>()?;
        for (i, &g) in group_of.iter().enumerate() {
            groups[g].members.push(i);
        }

        let mut iterations = 0;
        loop {
            if iterations == params.max_iterations {
                warn!(
                    iterations,
                    "k-medoids refinement stopped at the iteration cap before converging"
                );
                break;
            }
            iterations += 1;

            let new_centers: Vec<usize> = groups
                .par_iter()
                .map(|g| dist.best_center(g))
                .collect::<Result<_>>()?;
            let mut recentered = 0;
            for (g, c) in groups.iter_mut().zip(new_centers) {
                if g.center != c {
                    g.center = c;
                    recentered += 1;
                }
            }

            let centers: Vec<usize> = groups.iter().map(|g| g.center).collect();
            let targets: Vec<usize> = (0..n)
                .into_par_iter()
                .map(|i| dist.reassign(i, group_of[i], &centers))
                .collect::<Result<_>>()?;
            let mut moved = 0;
            for (i, target) in targets.into_iter().enumerate() {
                let from = group_of[i];
                if target == from {
                    continue;
                }
                groups[from].members.retain(|&m| m != i);
                groups[target].members.push(i);
                group_of[i] = target;
                moved += 1;
            }

            debug!(iteration = iterations, recentered, moved, "k-medoids pass");
            if recentered == 0 && moved == 0 {
                break;
            }
        }

        info!(
            items = n,
            k,
            iterations,
            cached_pairs = cache.len(),
            computations = cache.computations(),
            "built k-medoids index"
        );

        let nodes = items
            .into_iter()
            .zip(group_of)
            .map(|(mesh, group)| ClusterNode { mesh, group })
            .collect();

        Ok(Self {
            config,
            nodes,
            groups,
            iterations,
            cached_pairs: cache.len(),
            distance_computations: cache.computations(),
        })
    }

    /// Rebuild a partition from `(medoid id, member ids)` pairs, resolving
    /// ids against `db`. Member lists include the medoid.
    pub fn from_groups(
        db: &FeatureDatabase,
        config: DistanceConfig,
        groups: Vec<(u32, Vec<u32>)>,
    ) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut out = Vec::with_capacity(groups.len());
        let mut seen = HashSet::new();

        for (g, (medoid, members)) in groups.into_iter().enumerate() {
            let mut group = ClusterGroup {
                center: usize::MAX,
                members: Vec::with_capacity(members.len()),
            };
            for id in members {
                if !seen.insert(id) {
                    return Err(RetrieveError::DuplicateId { id });
                }
                let mesh = db.get(id).ok_or(RetrieveError::UnknownItem { id })?;
                if id == medoid {
                    group.center = nodes.len();
                }
                group.members.push(nodes.len());
                nodes.push(ClusterNode {
                    mesh: mesh.clone(),
                    group: g,
                });
            }
            if group.center == usize::MAX {
                return Err(RetrieveError::InvalidConfiguration(format!(
                    "medoid {medoid} is not a member of its own group"
                )));
            }
            out.push(group);
        }

        Ok(Self {
            config,
            nodes,
            groups: out,
            iterations: 0,
            cached_pairs: 0,
            distance_computations: 0,
        })
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Number of groups.
    pub fn k(&self) -> usize {
        self.groups.len()
    }

    /// Number of clustered items.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Refinement passes run by the build (0 for a loaded index).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Distinct item pairs whose distance the build cached.
    pub fn cached_pairs(&self) -> usize {
        self.cached_pairs
    }

    /// Distance evaluations the build actually ran; cache hits excluded.
    pub fn distance_computations(&self) -> usize {
        self.distance_computations
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn groups(&self) -> &[ClusterGroup] {
        &self.groups
    }

    /// Medoid of group `g`.
    ///
    /// # Panics
    ///
    /// Panics if `g >= self.k()`.
    pub fn medoid(&self, g: usize) -> &MeshStatistics {
        &self.nodes[self.groups[g].center].mesh
    }

    /// Members of group `g`, in membership order.
    ///
    /// # Panics
    ///
    /// Panics if `g >= self.k()`.
    pub fn group_members(&self, g: usize) -> impl Iterator<Item = &MeshStatistics> + '_ {
        self.groups[g].members.iter().map(move |&i| &self.nodes[i].mesh)
    }

    /// Group currently holding item `id`.
    pub fn group_of(&self, id: u32) -> Option<usize> {
        self.nodes.iter().find(|n| n.mesh.id == id).map(|n| n.group)
    }

    /// `(medoid id, member ids)` per group.
    pub fn group_ids(&self) -> Vec<(u32, Vec<u32>)> {
        (0..self.groups.len())
            .map(|g| {
                (
                    self.medoid(g).id,
                    self.group_members(g).map(|m| m.id).collect(),
                )
            })
            .collect()
    }

    /// Human-readable listing of groups and their members.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Cluster index with {} clusters and {} nodes",
            self.groups.len(),
            self.nodes.len()
        );
        for (g, (medoid, members)) in self.group_ids().into_iter().enumerate() {
            out.push_str(&format!("\nCluster {} with center {}", g + 1, medoid));
            for id in members {
                out.push_str(&format!("\n\tMesh {id}"));
            }
        }
        out
    }
}

/// Farthest-point seeding: after the first medoid, repeatedly take the item
/// whose distance to its nearest medoid is largest.
fn seed_medoids(dist: &PairDistance<'_>, n: usize, k: usize, seed: Option<u64>) -> Result<Vec<usize>> {
    let first = match seed {
        Some(s) => StdRng::seed_from_u64(s).random_range(0..n),
        None => 0,
    };
    let mut centers = Vec::with_capacity(k);
    centers.push(first);

    while centers.len() < k {
        let scores: Vec<f32> = (0..n)
            .into_par_iter()
            .map(|i| {
                if centers.contains(&i) {
                    return Ok(f32::NEG_INFINITY);
                }
                let mut min = f32::INFINITY;
                for &c in &centers {
                    min = min.min(dist.between(i, c)?);
                }
                Ok(min)
            })
            .collect::<Result<_>>()?;

        let mut next = None;
        let mut best = f32::NEG_INFINITY;
        for (i, &s) in scores.iter().enumerate() {
            if centers.contains(&i) {
                continue;
            }
            if next.is_none() || s > best {
                next = Some(i);
                best = s;
            }
        }
        // n >= k guarantees a non-medoid candidate exists.
        match next {
            Some(i) => centers.push(i),
            None => return Err(RetrieveError::InsufficientItems { items: n, k }),
        }
    }
    Ok(centers)
}
