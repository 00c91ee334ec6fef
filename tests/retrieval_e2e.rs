//! End-to-end retrieval tests over synthetic shape descriptors.
//!
//! Each scenario goes through the public API the way a caller would:
//! files on disk, a normalized database, a cluster index, queries and an
//! evaluation report.

use std::collections::HashSet;

use approx::assert_relative_eq;
use shapeseek::evaluation::{evaluate_with, QuerySize, Strategy};
use shapeseek::persistence::{
    list_mesh_ids, read_classification_file, read_database_file, read_index_file,
    write_database_file, write_index_file,
};
use shapeseek::{
    evaluate, search, search_via_index, ClusterIndex, ClusterParams, DistanceConfig,
    DistanceFunction, FeatureDatabase, FeatureLayout, FeatureVector, MeshStatistics,
    RetrievalConfig, RetrieveError, SearchLimit,
};

/// Standard-layout descriptor: scalars around `base`, every histogram
/// peaked at bin `peak`.
fn descriptor(base: f32, jitter: f32, peak: usize) -> FeatureVector {
    let mut data: Vec<f32> = (0..6).map(|i| base + jitter + i as f32 * 0.1).collect();
    for _ in 0..5 {
        for bin in 0..10 {
            let mass = if bin == peak { 80.0 } else { 2.0 };
            data.push(mass + jitter * 10.0);
        }
    }
    FeatureVector::new(data)
}

/// Three "cup" meshes (ids 1..=3) and three "ant" meshes (ids 11..=13).
fn shapes() -> Vec<MeshStatistics> {
    let mut out = Vec::new();
    for i in 0..3u32 {
        let j = i as f32 * 0.05;
        out.push(MeshStatistics::new(1 + i, "cup", descriptor(1.0, j, 1)));
        out.push(MeshStatistics::new(11 + i, "ant", descriptor(5.0, j, 8)));
    }
    out
}

fn point(id: u32, x: f32, y: f32) -> MeshStatistics {
    MeshStatistics::new(id, "?", FeatureVector::new(vec![x, y]))
}

fn plane() -> FeatureLayout {
    FeatureLayout::with_scalars(vec!["x".into(), "y".into()])
}

fn euclidean() -> DistanceConfig {
    DistanceConfig::uniform(DistanceFunction::Euclidean)
}

#[test]
fn clustering_finds_two_obvious_groups_from_every_start() {
    let items = vec![
        point(1, 0.0, 0.0),
        point(2, 1.0, 0.0),
        point(3, 0.0, 1.0),
        point(4, 50.0, 50.0),
        point(5, 51.0, 50.0),
        point(6, 50.0, 51.0),
    ];
    let expected: HashSet<Vec<u32>> = [vec![1, 2, 3], vec![4, 5, 6]].into_iter().collect();

    let mut params = vec![ClusterParams::with_k(2)];
    params.extend((0..16).map(|s| ClusterParams::with_k(2).with_seed(s)));
    for p in params {
        let index = ClusterIndex::build_from(items.clone(), euclidean(), &p).unwrap();
        assert!(index.iterations() < p.max_iterations);
        let found: HashSet<Vec<u32>> = index
            .group_ids()
            .into_iter()
            .map(|(_, mut m)| {
                m.sort_unstable();
                m
            })
            .collect();
        assert_eq!(found, expected, "seed {:?}", p.seed);
    }
}

#[test]
fn exhaustive_search_orders_and_thresholds() {
    // Distances from the origin: 1, 2, 3, 4, 5.
    let members = vec![
        point(1, 0.0, 4.0),
        point(2, 3.0, 4.0),
        point(3, 1.0, 0.0),
        point(4, 0.0, 3.0),
        point(5, 2.0, 0.0),
    ];
    let db = FeatureDatabase::new(plane(), members).unwrap();
    let origin = FeatureVector::new(vec![0.0, 0.0]);

    let top = search(&db, &origin, SearchLimit::TopK(3), &euclidean()).unwrap();
    assert_eq!(top.iter().map(|m| m.item.id).collect::<Vec<_>>(), vec![3, 5, 4]);
    assert!(top.windows(2).all(|w| w[0].distance < w[1].distance));

    let third = top[2].distance;
    let within = search(&db, &origin, SearchLimit::Threshold(third), &euclidean()).unwrap();
    assert_eq!(within.len(), 3);

    let everything = search(&db, &origin, SearchLimit::TopK(0), &euclidean()).unwrap();
    assert_eq!(everything.len(), 5);
    assert_relative_eq!(everything[4].distance, 5.0);
}

#[test]
fn first_tier_recall_is_perfect_when_nearest_neighbours_share_class() {
    let mut db = FeatureDatabase::new(FeatureLayout::standard().clone(), shapes()).unwrap();
    db.normalize().unwrap();
    let config = DistanceConfig::new(
        &[DistanceFunction::Euclidean, DistanceFunction::EarthMovers],
        db.layout(),
    )
    .unwrap();

    let report = evaluate(&db, &config, true).unwrap();
    assert_eq!(report.queries, 6);
    for (class, counts) in &report.per_class {
        assert_relative_eq!(counts.recall(), 1.0);
        assert_relative_eq!(counts.precision(), 1.0);
        assert_eq!(counts.true_positives, 9, "class {class}");
    }
}

#[test]
fn full_pipeline_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    // Mesh files exist for every shape except 13; 99 has NaN features.
    let meshes = root.join("meshes");
    std::fs::create_dir_all(meshes.join("cups")).unwrap();
    for id in [1, 2, 3] {
        std::fs::write(meshes.join("cups").join(format!("m{id}.off")), b"").unwrap();
    }
    for id in [11, 12, 99] {
        std::fs::write(meshes.join(format!("m{id}.off")), b"").unwrap();
    }

    let mut broken = descriptor(3.0, 0.0, 4).into_inner();
    broken[0] = f32::NAN;
    let mut raw = shapes();
    raw.push(MeshStatistics::new(99, "?", FeatureVector::new(broken)));
    let raw = FeatureDatabase::new(FeatureLayout::standard().clone(), raw).unwrap();
    let raw_path = root.join("features.csv");
    write_database_file(&raw, &raw_path).unwrap();

    let labels_path = root.join("classes.csv");
    std::fs::write(
        &labels_path,
        "ID;Class\n1;cup\n2;cup\n3;cup\n11;ant\n12;ant\n13;ant\n99;blob\n",
    )
    .unwrap();

    let cfg = RetrievalConfig::from_json_str(r#"{ "k": 3, "clusters": 2, "seed": 4 }"#).unwrap();
    cfg.validate(FeatureLayout::standard()).unwrap();

    // Load, restrict to existing meshes, label, normalize, drop broken rows.
    let mut db = read_database_file(&raw_path, FeatureLayout::standard()).unwrap();
    assert_eq!(db.len(), 7);
    assert_eq!(db.filter(&list_mesh_ids(&meshes).unwrap()), 1);
    db.assign_classes(&read_classification_file(&labels_path).unwrap())
        .unwrap();
    db.normalize().unwrap();
    assert!(matches!(db.normalize(), Err(RetrieveError::AlreadyNormalized)));
    assert!(!db.normalization().unwrap().average.has_non_finite());
    assert_eq!(db.filter_nan_and_inf(cfg.verbose), vec![99]);
    assert_eq!(db.len(), 5);

    let norm_path = root.join("features_normalized.csv");
    write_database_file(&db, &norm_path).unwrap();
    let db = read_database_file(&norm_path, FeatureLayout::standard()).unwrap();
    assert!(db.is_normalized());
    assert_eq!(db.len(), 5);

    // A raw query lands on its own stored descriptor.
    let config = cfg.distance_config(db.layout()).unwrap();
    let query = db.normalize_query(descriptor(1.0, 0.05, 1)).unwrap();
    let hits = search(&db, &query, cfg.search_limit().unwrap(), &config).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].item.id, 2);
    assert!(hits[0].distance < 1e-3);
    assert!(hits.iter().all(|m| m.item.classification == "cup"));

    // Cluster index survives a file round trip and routes to the cup group.
    let index = ClusterIndex::build(&db, config, &cfg.cluster_params()).unwrap();
    let index_path = root.join("clusters.csv");
    write_index_file(&index, &index_path).unwrap();
    let index = read_index_file(&index_path, &db).unwrap();
    assert_eq!(index.k(), 2);

    let routed = search_via_index(&index, &query, 1).unwrap();
    let mut routed_ids: Vec<u32> = routed.iter().map(|m| m.id).collect();
    routed_ids.sort_unstable();
    assert_eq!(routed_ids, vec![1, 2, 3]);

    let report = evaluate_with(&db, Strategy::ClusterRouted(&index), QuerySize::FirstTier).unwrap();
    assert_relative_eq!(report.total.recall(), 1.0);
    assert_relative_eq!(report.total.precision(), 1.0);
    assert!(report.summary().lines().any(|l| l.starts_with("ant")));
}

#[test]
fn missing_label_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let labels_path = dir.path().join("classes.csv");
    std::fs::write(&labels_path, "ID;Class\n1;cup\n").unwrap();

    let mut db = FeatureDatabase::new(FeatureLayout::standard().clone(), shapes()).unwrap();
    let labels = read_classification_file(&labels_path).unwrap();
    assert!(matches!(
        db.assign_classes(&labels),
        Err(RetrieveError::MissingClassification { .. })
    ));
    // Nothing was relabelled.
    assert_eq!(db.get(1).unwrap().classification, "cup");
}
