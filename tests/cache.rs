use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use composer_updates::version::cache::{Cache, MetadataStorer, current_timestamp_ms};
use composer_updates::version::types::PackageRecord;

const REPOSITORY: &str = "https://repo.packagist.org";

fn records(versions: &[&str]) -> Vec<PackageRecord> {
    versions
        .iter()
        .map(|version| PackageRecord::new("monolog/monolog", version))
        .collect()
}

#[test]
fn metadata_survives_reopening_the_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let cache = Cache::new(&db_path).unwrap();
        cache
            .replace_metadata(REPOSITORY, "monolog/monolog", records(&["3.0.0", "3.5.0"]))
            .unwrap();
    }

    let cache = Cache::new(&db_path).unwrap();
    let cached = cache
        .get_metadata(REPOSITORY, "monolog/monolog")
        .unwrap()
        .unwrap();

    assert_eq!(cached.records, records(&["3.0.0", "3.5.0"]));
    assert!(!cached.not_found);
    assert!(cached.updated_at <= current_timestamp_ms());
}

#[test]
fn not_found_marker_survives_reopening_the_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let cache = Cache::new(&db_path).unwrap();
        cache.mark_not_found(REPOSITORY, "acme/ghost").unwrap();
    }

    let cache = Cache::new(&db_path).unwrap();
    let cached = cache.get_metadata(REPOSITORY, "acme/ghost").unwrap().unwrap();

    assert!(cached.not_found);
    assert!(cached.records.is_empty());
}

#[test]
fn concurrent_writers_share_one_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(Cache::new(&temp_dir.path().join("test.db")).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let name = format!("acme/package-{}", i);
                cache
                    .replace_metadata(REPOSITORY, &name, vec![PackageRecord::new(&name, "1.0.0")])
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..8 {
        let name = format!("acme/package-{}", i);
        assert!(cache.get_metadata(REPOSITORY, &name).unwrap().is_some());
    }
    assert_eq!(cache.clear().unwrap(), 8);
}
