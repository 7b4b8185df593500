//! Test fixtures for deterministic testing

#![allow(dead_code)]

use fsstat::services::sink::MemorySink;
use fsstat::{NodeRecord, ScanOptions, ScanReport, SkipPolicy};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MIB: u64 = 1024 * 1024;

/// Create a simple test directory structure
///
/// ```text
/// simple_test/
///   file1.txt               13 bytes
///   subdir1/file2.txt       1 KiB
///   subdir1/nested/file4.txt 512 bytes
///   subdir2/file3.txt       2 KiB
/// ```
pub fn create_simple_fixture(base: &Path) -> std::io::Result<PathBuf> {
    let fixture_dir = base.join("simple_test");

    fs::create_dir_all(fixture_dir.join("subdir1/nested"))?;
    fs::create_dir_all(fixture_dir.join("subdir2"))?;

    write_file_sync(fixture_dir.join("file1.txt"), b"Hello, World!")?;
    write_file_sync(fixture_dir.join("subdir1/file2.txt"), &[b'A'; 1024])?;
    write_file_sync(fixture_dir.join("subdir2/file3.txt"), &[b'B'; 2048])?;
    write_file_sync(fixture_dir.join("subdir1/nested/file4.txt"), &[b'C'; 512])?;

    Ok(fixture_dir)
}

/// Total logical bytes in `create_simple_fixture`
pub const SIMPLE_FIXTURE_BYTES: u64 = 13 + 1024 + 2048 + 512;

/// Write a file and flush it to disk before returning
pub fn write_file_sync<P: AsRef<Path>>(path: P, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// A file with a large logical size and (almost) no allocated blocks
pub fn sparse_file<P: AsRef<Path>>(path: P, len: u64) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    file.set_len(len)
}

/// Options that persist everything, for tests that inspect every record
pub fn keep_all() -> ScanOptions {
    ScanOptions {
        skip_policy: SkipPolicy::KeepAll,
        ..ScanOptions::default()
    }
}

/// Scan into memory and return the report; the records are in
/// `report.drain.records`, ordered by id.
pub fn memory_scan(root: &Path, opts: &ScanOptions) -> ScanReport {
    fsstat::scan(root, opts, Box::new(MemorySink::new())).expect("scan failed")
}

pub fn find<'a>(records: &'a [NodeRecord], suffix: &str) -> &'a NodeRecord {
    records
        .iter()
        .find(|r| r.path.ends_with(suffix))
        .unwrap_or_else(|| panic!("no record ending in {suffix}"))
}
