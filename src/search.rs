//! Retrieval: exhaustive ranked search and cluster-routed approximate search.
//!
//! | Strategy | Touches | Order within result |
//! |----------|---------|---------------------|
//! | [`search`] | every member | ascending distance, stable |
//! | [`search_via_index`] | every medoid + visited groups | group order, membership order inside a group |
//! | [`search_via_ann`] | ANN candidates | ascending distance, stable |
//!
//! Cluster-routed search does not re-rank inside a visited group and never
//! truncates a group: it may return more than `k` items.

use rayon::prelude::*;

use crate::ann::ExternalAnnIndex;
use crate::database::FeatureDatabase;
use crate::distance::DistanceConfig;
use crate::error::{Result, RetrieveError};
use crate::feature::{FeatureVector, MeshStatistics};
use crate::partitioning::ClusterIndex;

/// Default number of results when neither `k` nor a threshold is given.
pub const DEFAULT_K: usize = 5;

/// How many ranked results to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchLimit {
    /// The `k` nearest; `0` keeps everything.
    TopK(usize),
    /// Every item with `distance <= t`.
    Threshold(f32),
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::TopK(DEFAULT_K)
    }
}

impl SearchLimit {
    /// Resolve optional `k` / threshold settings; they are mutually exclusive
    /// and a threshold must not be NaN.
    pub fn from_options(k: Option<usize>, threshold: Option<f32>) -> Result<Self> {
        if threshold.is_some_and(f32::is_nan) {
            return Err(RetrieveError::InvalidConfiguration(
                "threshold must be a number".to_string(),
            ));
        }
        match (k, threshold) {
            (Some(_), Some(_)) => Err(RetrieveError::InvalidConfiguration(
                "k and threshold cannot both be set".to_string(),
            )),
            (Some(k), None) => Ok(SearchLimit::TopK(k)),
            (None, Some(t)) => Ok(SearchLimit::Threshold(t)),
            (None, None) => Ok(SearchLimit::default()),
        }
    }

    fn apply(self, ranked: &mut Vec<Match<'_>>) {
        match self {
            SearchLimit::TopK(0) => {}
            SearchLimit::TopK(k) => ranked.truncate(k),
            SearchLimit::Threshold(t) => {
                let keep = ranked.iter().take_while(|m| m.distance <= t).count();
                ranked.truncate(keep);
            }
        }
    }
}

/// A ranked result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub item: &'a MeshStatistics,
    pub distance: f32,
}

/// Score `items` against `query` in parallel and sort ascending.
///
/// The sort is stable, so equal distances keep input order.
pub fn rank<'a>(
    items: &[&'a MeshStatistics],
    query: &FeatureVector,
    config: &DistanceConfig,
) -> Result<Vec<Match<'a>>> {
    let mut ranked: Vec<Match<'a>> = items
        .par_iter()
        .map(|&item| {
            config
                .distance(query, &item.features)
                .map(|distance| Match { item, distance })
        })
        .collect::<Result<_>>()?;
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(ranked)
}

/// Exhaustive search over every member of `db`.
pub fn search<'a>(
    db: &'a FeatureDatabase,
    query: &FeatureVector,
    limit: SearchLimit,
    config: &DistanceConfig,
) -> Result<Vec<Match<'a>>> {
    let items: Vec<&MeshStatistics> = db.iter().collect();
    let mut ranked = rank(&items, query, config)?;
    limit.apply(&mut ranked);
    Ok(ranked)
}

/// Cluster-routed approximate search.
///
/// Groups are visited by ascending medoid distance; each visited group is
/// emitted whole until at least `k` items were emitted (`k == 0` visits all
/// groups).
pub fn search_via_index<'a>(
    index: &'a ClusterIndex,
    query: &FeatureVector,
    k: usize,
) -> Result<Vec<&'a MeshStatistics>> {
    let config = index.config();
    let mut order: Vec<(usize, f32)> = (0..index.k())
        .into_par_iter()
        .map(|g| {
            config
                .distance(query, &index.medoid(g).features)
                .map(|d| (g, d))
        })
        .collect::<Result<_>>()?;
    order.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut out = Vec::with_capacity(if k == 0 { index.len() } else { k });
    for (g, _) in order {
        out.extend(index.group_members(g));
        if k != 0 && out.len() >= k {
            break;
        }
    }
    Ok(out)
}

/// Ask an external index for `k` candidates and re-score them.
pub fn search_via_ann<'a, I: ExternalAnnIndex + ?Sized>(
    db: &'a FeatureDatabase,
    index: &I,
    query: &FeatureVector,
    k: usize,
    config: &DistanceConfig,
) -> Result<Vec<Match<'a>>> {
    let positions = index.search(query.as_slice(), k)?;
    let members = db.members();
    let items = positions
        .into_iter()
        .map(|p| {
            members.get(p).ok_or_else(|| {
                RetrieveError::InvalidConfiguration(format!(
                    "external index returned position {p} for a database of {}",
                    members.len()
                ))
            })
        })
        .collect::<Result<Vec<&MeshStatistics>>>()?;
    rank(&items, query, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ann::build_external;
    use crate::distance::DistanceFunction;
    use crate::feature::FeatureLayout;
    use crate::partitioning::ClusterParams;

    fn line_db() -> FeatureDatabase {
        // Points on a line at 0, 1, 3, 6, 10.
        let members = [0.0, 1.0, 3.0, 6.0, 10.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| MeshStatistics::new(i as u32 + 1, "c", FeatureVector::new(vec![x])))
            .collect();
        FeatureDatabase::new(FeatureLayout::with_scalars(vec!["x".into()]), members).unwrap()
    }

    fn euclidean() -> DistanceConfig {
        DistanceConfig::uniform(DistanceFunction::Euclidean)
    }

    fn ids(matches: &[Match<'_>]) -> Vec<u32> {
        matches.iter().map(|m| m.item.id).collect()
    }

    #[test]
    fn limit_options_are_exclusive() {
        assert_eq!(SearchLimit::from_options(None, None).unwrap(), SearchLimit::TopK(5));
        assert_eq!(SearchLimit::from_options(Some(3), None).unwrap(), SearchLimit::TopK(3));
        assert!(SearchLimit::from_options(Some(3), Some(1.0)).is_err());
        assert_eq!(
            SearchLimit::from_options(None, Some(0.5)).unwrap(),
            SearchLimit::Threshold(0.5)
        );
    }

    #[test]
    fn nan_threshold_is_rejected() {
        assert!(matches!(
            SearchLimit::from_options(None, Some(f32::NAN)),
            Err(RetrieveError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn top_k_returns_nearest_in_order() {
        let db = line_db();
        let q = FeatureVector::new(vec![2.0]);
        let res = search(&db, &q, SearchLimit::TopK(3), &euclidean()).unwrap();
        assert_eq!(ids(&res), vec![2, 3, 1]);
        assert_eq!(
            res.iter().map(|m| m.distance).collect::<Vec<_>>(),
            vec![1.0, 1.0, 2.0]
        );
    }

    #[test]
    fn ties_keep_database_order() {
        let db = line_db();
        let q = FeatureVector::new(vec![2.0]);
        let res = search(&db, &q, SearchLimit::TopK(2), &euclidean()).unwrap();
        // Items 2 and 3 are both at distance 1.
        assert_eq!(ids(&res), vec![2, 3]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let db = line_db();
        let q = FeatureVector::new(vec![0.0]);
        let res = search(&db, &q, SearchLimit::Threshold(3.0), &euclidean()).unwrap();
        assert_eq!(ids(&res), vec![1, 2, 3]);
    }

    #[test]
    fn top_zero_returns_everything() {
        let db = line_db();
        let q = FeatureVector::new(vec![0.0]);
        let res = search(&db, &q, SearchLimit::TopK(0), &euclidean()).unwrap();
        assert_eq!(res.len(), 5);
    }

    #[test]
    fn query_of_wrong_length_fails() {
        let db = line_db();
        let q = FeatureVector::new(vec![0.0, 1.0]);
        assert!(matches!(
            search(&db, &q, SearchLimit::default(), &euclidean()),
            Err(RetrieveError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn cluster_routed_search_emits_whole_groups() {
        let db = line_db();
        let index = ClusterIndex::build(&db, euclidean(), &ClusterParams::with_k(2)).unwrap();
        let q = FeatureVector::new(vec![0.5]);

        let nearest_group = index.group_of(1).unwrap();
        let group_size = index.groups()[nearest_group].len();

        let res = search_via_index(&index, &q, 1).unwrap();
        assert_eq!(res.len(), group_size);
        assert!(res.iter().all(|m| index.group_of(m.id) == Some(nearest_group)));

        let all = search_via_index(&index, &q, 0).unwrap();
        assert_eq!(all.len(), db.len());
    }

    struct Exact {
        rows: Vec<Vec<f32>>,
    }

    impl ExternalAnnIndex for Exact {
        fn build(&mut self, dimension: usize, _count: usize, _k: usize, data: &[f32]) -> Result<()> {
            self.rows = data.chunks(dimension).map(<[f32]>::to_vec).collect();
            Ok(())
        }

        fn search(&self, query: &[f32], k: usize) -> Result<Vec<usize>> {
            // Reverse order on purpose: the engine must re-sort.
            let mut scored: Vec<(usize, f32)> = self
                .rows
                .iter()
                .enumerate()
                .map(|(i, r)| (i, crate::distance::euclidean_distance(query, r)))
                .collect();
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            scored.truncate(k);
            scored.reverse();
            Ok(scored.into_iter().map(|(i, _)| i).collect())
        }
    }

    #[test]
    fn ann_candidates_are_rescored() {
        let db = line_db();
        let mut ann = Exact { rows: Vec::new() };
        build_external(&mut ann, &db, 2).unwrap();
        let q = FeatureVector::new(vec![5.0]);
        let res = search_via_ann(&db, &ann, &q, 2, &euclidean()).unwrap();
        assert_eq!(ids(&res), vec![4, 3]);
    }
}
