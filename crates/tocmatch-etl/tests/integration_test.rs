//! Integration tests for the catalog → index → lookup path.
//!
//! These tests use an on-disk SQLite catalog in a temp directory and build
//! real indices from it.

use std::sync::Arc;

use tempfile::TempDir;
use tocmatch_core::schema::Database;
use tocmatch_core::{embed, TrackRow};
use tocmatch_etl::IndexBuilder;
use tocmatch_search::{IndexHandle, LookupService, SearchError, TocMatch};

fn tracklist(id: u64, durations: &[i64]) -> Vec<TrackRow> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &d)| TrackRow::new(id, i as u32 + 1, d))
        .collect()
}

fn seeded_catalog(temp_dir: &TempDir) -> Database {
    let db = Database::open(temp_dir.path().join("catalog.db")).expect("Failed to open catalog");

    let mut rows = Vec::new();
    // "1 4 60150 150 15150 30150 45150" as a catalog entry.
    rows.extend(tracklist(100, &[200_000, 200_000, 200_000, 200_000]));
    rows.extend(tracklist(101, &[200_500, 199_500, 200_000, 200_000]));
    rows.extend(tracklist(102, &[200_000, 0, 200_000, 200_000]));
    rows.extend(tracklist(103, &[200_000, 200_000, 200_000]));
    rows.extend(tracklist(
        104,
        &[
            184_000, 203_000, 250_000, 199_000, 301_000, 222_000, 187_000, 240_000,
        ],
    ));
    db.insert_tracks(&rows).expect("Failed to insert rows");
    db
}

/// A TOC whose durations match tracklist 100 exactly
const TOC: &str = "1 4 60150 150 15150 30150 45150";

#[test]
fn test_build_and_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);

    let built = IndexBuilder::new()
        .build_from_database(&db, 3)
        .expect("Build failed");
    assert_eq!(built.stats.tracklists, 5);
    assert_eq!(built.stats.indexed, 3);

    let service = LookupService::new(Arc::new(IndexHandle::with_index(built.index)));
    let matches = service.lookup(TOC, 1_000).unwrap();
    assert_eq!(
        matches,
        vec![
            TocMatch {
                id: 100,
                distance_ms: 0
            },
            TocMatch {
                id: 101,
                distance_ms: 707
            },
        ]
    );
}

#[test]
fn test_dropped_tracklists_never_match() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);
    let built = IndexBuilder::new().build_from_database(&db, 2).unwrap();

    assert!(!built.index.ids().contains(102));
    assert!(!built.index.ids().contains(103));

    // Exact TOC for the three-track tracklist 103.
    let service = LookupService::new(Arc::new(IndexHandle::with_index(built.index)));
    let matches = service.lookup("1 3 45150 150 15150 30150", u64::MAX).unwrap();
    assert!(matches.iter().all(|m| m.id != 103));
}

#[test]
fn test_long_tracklist_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);
    let built = IndexBuilder::new().build_from_database(&db, 100).unwrap();

    let durations = db.get_tracklist(104).unwrap().unwrap();
    let durations: Vec<u64> = durations.into_iter().map(|d| d as u64).collect();
    let hits = built.index.query(&embed(&durations), 1);
    assert_eq!(hits[0].id, 104);
    assert_eq!(hits[0].squared_distance, 0);
}

#[test]
fn test_rebuild_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);

    let first = IndexBuilder::new().build_from_database(&db, 2).unwrap();
    let second = IndexBuilder::new().build_from_database(&db, 5).unwrap();

    for raw in [TOC, "1 4 60150 150 16000 30000 45000", "1 2 30000 150 15000"] {
        assert_eq!(
            tocmatch_search::lookup(&first.index, raw, 100_000).unwrap(),
            tocmatch_search::lookup(&second.index, raw, 100_000).unwrap(),
            "{raw}"
        );
    }
}

#[test]
fn test_failed_rebuild_keeps_serving_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);
    let handle = Arc::new(IndexHandle::new());
    let service = LookupService::new(Arc::clone(&handle));

    assert!(matches!(
        service.lookup(TOC, 1_000),
        Err(SearchError::IndexNotReady)
    ));

    let built = IndexBuilder::new().build_from_database(&db, 2).unwrap();
    handle.install(built.index);

    let empty = Database::open(temp_dir.path().join("empty.db")).unwrap();
    let err = IndexBuilder::new()
        .build_from_database(&empty, 2)
        .unwrap_err();
    assert!(err.is_empty_batch());

    assert_eq!(service.lookup(TOC, 1_000).unwrap()[0].id, 100);
}

#[test]
fn test_invalid_toc_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let db = seeded_catalog(&temp_dir);
    let built = IndexBuilder::new().build_from_database(&db, 2).unwrap();
    let service = LookupService::new(Arc::new(IndexHandle::with_index(built.index)));

    let err = service.lookup("1 4 60150 150 15150", 1_000).unwrap_err();
    assert!(err.is_invalid_request());
}
