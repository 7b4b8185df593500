//! Aggregation correctness checked against a real scan

use crate::fixtures::{create_simple_fixture, keep_all, memory_scan, sparse_file};
use fsstat::models::{SizeClassTable, Totals};
use fsstat::services::aggregate::immediate_children;
use fsstat::{NodeRecord, ScanOptions, SizeClass};
use tempfile::TempDir;

fn expected_totals(dir: &NodeRecord, records: &[NodeRecord], opts: &ScanOptions) -> Totals {
    let mut totals = Totals::default();
    if opts.count_directory_size {
        totals.total_size = dir.self_size;
    }
    for child in immediate_children(records, dir.id) {
        totals.absorb(&Totals::contribution_of(child, opts.count_symlink_size));
    }
    totals
}

#[test]
fn test_every_directory_is_the_sum_of_its_children() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();
    sparse_file(root.join("subdir2/big.img"), 2 * 1024 * 1024 * 1024).unwrap();

    for count_directory_size in [false, true] {
        let opts = ScanOptions {
            count_directory_size,
            concurrency: 3,
            ..keep_all()
        };
        let report = memory_scan(&root, &opts);
        let records = &report.drain.records;

        for dir in records.iter().filter(|r| r.is_dir()) {
            assert_eq!(
                dir.totals,
                expected_totals(dir, records, &opts),
                "rollup mismatch at {}",
                dir.path
            );
        }

        let files = records.iter().filter(|r| r.is_file()).count() as u64;
        let root_record = report.root_record.unwrap();
        assert_eq!(root_record.totals.file_count, files);
        assert_eq!(root_record.totals.histogram.total_count(), files);
        assert_eq!(root_record.totals.histogram.bucket(SizeClass::XL).count, 1);
    }
}

#[test]
fn test_classification_is_stable() {
    let table = SizeClassTable::default();
    for size in [0, 1, 1024 * 1024 - 1, 1024 * 1024, 5 << 30, u64::MAX] {
        let first = table.classify(size);
        assert_eq!(first, table.classify(size));
        assert_eq!(SizeClass::ALL.iter().filter(|c| **c == first).count(), 1);
    }
}

#[test]
fn test_custom_size_classes_are_used() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();

    let opts = ScanOptions {
        size_classes: SizeClassTable::new([100, 1000, 2000, 4000]).unwrap(),
        ..keep_all()
    };
    let report = memory_scan(&root, &opts);
    let histogram = report.root_record.unwrap().totals.histogram;

    // 13 B -> S, 512 B -> M, 1 KiB -> L, 2 KiB -> XL
    assert_eq!(histogram.bucket(SizeClass::S).count, 1);
    assert_eq!(histogram.bucket(SizeClass::M).count, 1);
    assert_eq!(histogram.bucket(SizeClass::L).count, 1);
    assert_eq!(histogram.bucket(SizeClass::XL).count, 1);
    assert_eq!(histogram.bucket(SizeClass::XL).bytes, 2048);
}
