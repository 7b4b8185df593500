//! Integration tests for the scan driver

use crate::fixtures::{SIMPLE_FIXTURE_BYTES, create_simple_fixture, find, keep_all, memory_scan};
use fsstat::models::{ROOT_PARENT_ID, Totals};
use fsstat::{AsyncPolicy, Error, NodeKind, ScanOptions, ShutdownState};
use std::collections::{BTreeMap, HashSet};
use tempfile::TempDir;

#[test]
fn test_scan_via_api() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();

    let report = memory_scan(&root, &keep_all());
    assert_eq!(report.state, ShutdownState::Stopped);

    let root_record = report.root_record.as_ref().unwrap();
    assert_eq!(root_record.kind, NodeKind::Directory);
    assert_eq!(root_record.parent_id, ROOT_PARENT_ID);
    assert_eq!(root_record.totals.total_size, SIMPLE_FIXTURE_BYTES);
    assert_eq!(root_record.totals.file_count, 4);

    // 4 directories + 4 files
    let records = &report.drain.records;
    assert_eq!(records.len(), 8);
    assert_eq!(report.records_emitted, 8);
    assert_eq!(report.drain.records_received, 8);
    assert_eq!(report.drain.bytes_scanned, SIMPLE_FIXTURE_BYTES);

    let subdir1 = find(records, "subdir1");
    assert_eq!(subdir1.totals.total_size, 1024 + 512);
    assert_eq!(subdir1.totals.file_count, 2);
    assert_eq!(subdir1.parent_id, root_record.id);
}

#[test]
fn test_root_is_recorded_as_absolute_path() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();

    let report = memory_scan(&root, &keep_all());
    assert!(std::path::Path::new(&report.root).is_absolute());
    assert_eq!(report.root_record.unwrap().path, report.root);
}

#[test]
fn test_missing_root_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    let result = fsstat::scan(
        temp_dir.path().join("nope"),
        &ScanOptions::default(),
        Box::new(fsstat::services::sink::MemorySink::new()),
    );
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_invalid_options_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let opts = ScanOptions {
        concurrency: 0,
        ..ScanOptions::default()
    };
    let result = fsstat::scan(
        temp_dir.path(),
        &opts,
        Box::new(fsstat::services::sink::MemorySink::new()),
    );
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_ids_unique_for_every_concurrency() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for d in 0..6 {
        let dir = root.join(format!("d{d}"));
        std::fs::create_dir_all(dir.join("inner")).unwrap();
        for f in 0..5 {
            std::fs::write(dir.join(format!("f{f}")), vec![0u8; f * 10]).unwrap();
            std::fs::write(dir.join(format!("inner/g{f}")), b"g").unwrap();
        }
    }

    for concurrency in [1, 2, 128] {
        let opts = ScanOptions {
            concurrency,
            ..keep_all()
        };
        let report = memory_scan(root, &opts);
        let records = &report.drain.records;

        let ids: HashSet<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), records.len(), "duplicate ids at C={concurrency}");
        assert!(!ids.contains(&0));

        let root_id = report.root_record.as_ref().unwrap().id;
        let roots: Vec<_> = records.iter().filter(|r| r.parent_id == ROOT_PARENT_ID).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, root_id);
        for record in records {
            assert!(
                record.parent_id == ROOT_PARENT_ID || ids.contains(&record.parent_id),
                "parent of {} missing at C={concurrency}",
                record.path
            );
        }
        assert!(report.peak_permits <= concurrency);
    }
}

fn totals_by_path(report: &fsstat::ScanReport) -> BTreeMap<String, (NodeKind, Totals)> {
    report
        .drain
        .records
        .iter()
        .map(|r| (r.path.clone(), (r.kind, r.totals)))
        .collect()
}

#[test]
fn test_async_depth_does_not_change_totals() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();
    for extra in ["subdir1/nested/deep/a", "subdir1/nested/deep/b", "subdir2/x/y/z"] {
        std::fs::create_dir_all(root.join(extra)).unwrap();
        std::fs::write(root.join(extra).join("f.bin"), vec![0u8; extra.len()]).unwrap();
    }

    let sync_only = ScanOptions {
        async_depth: 0,
        ..keep_all()
    };
    let baseline = totals_by_path(&memory_scan(&root, &sync_only));
    assert_eq!(baseline.len(), 17);

    for async_depth in [1, 2, 3, 64] {
        for async_policy in [AsyncPolicy::DepthBudget, AsyncPolicy::Saturation] {
            for concurrency in [1, 2, 8] {
                let opts = ScanOptions {
                    async_depth,
                    async_policy,
                    concurrency,
                    ..keep_all()
                };
                assert_eq!(
                    totals_by_path(&memory_scan(&root, &opts)),
                    baseline,
                    "depth {async_depth}, policy {async_policy}, C={concurrency}"
                );
            }
        }
    }
}

#[test]
fn test_scan_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();

    let first = memory_scan(&root, &keep_all());
    let second = memory_scan(&root, &keep_all());

    let summarize = |report: &fsstat::ScanReport| {
        let mut rows: Vec<_> = report
            .drain
            .records
            .iter()
            .map(|r| (r.path.clone(), r.kind, r.totals))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    };
    assert_eq!(summarize(&first), summarize(&second));
}

#[test]
fn test_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let report = memory_scan(temp_dir.path(), &keep_all());

    let root = report.root_record.unwrap();
    assert_eq!(root.totals.total_size, 0);
    assert_eq!(root.totals.file_count, 0);
    assert_eq!(report.drain.records.len(), 1);
}
