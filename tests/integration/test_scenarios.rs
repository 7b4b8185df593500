//! End-to-end scenarios: large-file skipping, dangling symlinks, sockets and
//! unreadable directories

use crate::fixtures::{MIB, find, keep_all, memory_scan, sparse_file, write_file_sync};
use fsstat::{ScanOptions, SizeClass, SkipPolicy};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// `root/{a.txt (10 B), sub/{b.txt (300 MiB), c.txt (5 B)}}`
fn large_file_tree(base: &Path) -> std::path::PathBuf {
    let root = base.join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    write_file_sync(root.join("a.txt"), &[b'a'; 10]).unwrap();
    sparse_file(root.join("sub/b.txt"), 300 * MIB).unwrap();
    write_file_sync(root.join("sub/c.txt"), &[b'c'; 5]).unwrap();
    root
}

fn persisted_names(report: &fsstat::ScanReport) -> HashSet<String> {
    report
        .drain
        .records
        .iter()
        .map(|r| r.path.rsplit('/').next().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_large_file_skipped_from_persistence_but_counted() {
    let temp_dir = TempDir::new().unwrap();
    let root = large_file_tree(temp_dir.path());

    let opts = ScanOptions {
        skip_policy: SkipPolicy::SkipAbove(200 * MIB),
        ..ScanOptions::default()
    };
    let report = memory_scan(&root, &opts);

    let expected: HashSet<String> = ["a.txt", "sub", "c.txt", "root"]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(persisted_names(&report), expected);
    assert_eq!(report.drain.records_received, 5);
    assert_eq!(report.drain.records_skipped, 1);

    let root_record = report.root_record.as_ref().unwrap();
    assert_eq!(root_record.totals.total_size, 300 * MIB + 15);
    assert_eq!(root_record.totals.file_count, 3);
    assert_eq!(root_record.totals.histogram.bucket(SizeClass::L).count, 1);
    assert_eq!(root_record.totals.histogram.bucket(SizeClass::S).count, 2);

    let sub = find(&report.drain.records, "sub");
    assert_eq!(sub.totals.total_size, 300 * MIB + 5);
    assert_eq!(sub.totals.file_count, 2);
}

#[test]
fn test_default_policy_keeps_only_large_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = large_file_tree(temp_dir.path());

    let report = memory_scan(&root, &ScanOptions::default());

    let expected: HashSet<String> = ["b.txt", "sub", "root"]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(persisted_names(&report), expected);
    assert_eq!(
        report.root_record.unwrap().totals.total_size,
        300 * MIB + 15
    );
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_counts_as_symlink() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file_sync(root.join("real.txt"), b"data").unwrap();
    std::os::unix::fs::symlink(root.join("does-not-exist"), root.join("dangling")).unwrap();

    let report = memory_scan(root, &keep_all());
    let root_record = report.root_record.as_ref().unwrap();
    assert_eq!(root_record.totals.symlink_count, 1);
    assert_eq!(root_record.totals.file_count, 1);
    assert_eq!(root_record.totals.total_size, 4);

    let link = find(&report.drain.records, "dangling");
    assert!(link.is_symlink());
    assert!(link.link_target.as_deref().unwrap().ends_with("does-not-exist"));
    assert_eq!(report.walk.total(), 0);
}

#[cfg(unix)]
#[test]
fn test_socket_is_skipped_as_unsupported() {
    use std::os::unix::net::UnixListener;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file_sync(root.join("a"), b"abc").unwrap();
    let _listener = UnixListener::bind(root.join("sock")).unwrap();

    let report = memory_scan(root, &keep_all());
    assert_eq!(report.drain.records.len(), 2);
    assert!(report.drain.records.iter().all(|r| !r.path.ends_with("sock")));
    assert_eq!(report.walk.unsupported, 1);
    assert_eq!(report.walk.total(), 1);

    let root_record = report.root_record.as_ref().unwrap();
    assert_eq!(root_record.totals.total_size, 3);
    assert_eq!(root_record.totals.file_count, 1);
    assert_eq!(root_record.totals.symlink_count, 0);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_contributes_nothing() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file_sync(root.join("visible.txt"), &[b'v'; 20]).unwrap();
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    write_file_sync(locked.join("hidden.txt"), &[b'h'; 99]).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can list the directory anyway.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!("skipping: running with permission to read mode 000 directories");
        return;
    }

    let result = fsstat::scan(
        root,
        &keep_all(),
        Box::new(fsstat::services::sink::MemorySink::new()),
    );
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let report = result.unwrap();

    let root_record = report.root_record.as_ref().unwrap();
    assert_eq!(root_record.totals.total_size, 20);
    assert_eq!(root_record.totals.file_count, 1);

    let locked_record = find(&report.drain.records, "locked");
    assert!(locked_record.is_dir());
    assert_eq!(locked_record.totals.total_size, 0);
    assert_eq!(locked_record.totals.file_count, 0);
    assert_eq!(report.walk.list_errors, 1);
}
