//! Output formatting for CLI

use crate::ScanReport;
use crate::models::{NodeRecord, ResourceUsage};
use crate::services::format::format_size;
use std::time::Duration;

/// Render the scan summary as human-readable text
#[must_use]
pub fn format_text(report: &ScanReport, top: &[NodeRecord]) -> String {
    let mut out = String::from("\n=========== Summary ===========\n");
    match &report.root_record {
        Some(root) => out.push_str(&record_lines(root)),
        None => out.push_str(&format!("{}: could not be examined\n", report.root)),
    }

    let drain = &report.drain;
    out.push_str(&format!("\nRecords emitted: {}\n", report.records_emitted));
    out.push_str(&format!(
        "Records persisted: {} ({} skipped, {} batches)\n",
        drain.records_persisted, drain.records_skipped, drain.batches
    ));
    if report.walk.total() > 0 {
        let walk = &report.walk;
        out.push_str(&format!(
            "Skipped entries: {} not found, {} stat errors, {} list errors, {} unreadable links, {} unsupported\n",
            walk.not_found, walk.stat_errors, walk.list_errors, walk.unreadable_links, walk.unsupported
        ));
    }

    if !top.is_empty() {
        out.push_str(&format!("\n{:<70} {:>12}\n", "Largest directories", "Size"));
        out.push_str(&"-".repeat(83));
        out.push('\n');
        for record in top {
            out.push_str(&format!(
                "{:<70} {:>12}\n",
                record.path,
                format_size(record.totals.total_size)
            ));
        }
    }

    out.push_str(&resource_lines(&report.resources, report.peak_permits));
    out
}

fn record_lines(record: &NodeRecord) -> String {
    let totals = &record.totals;
    let mut lines = format!(
        "Path: {}\nKind: {}\nTotal size: {}\nFiles: {}\nSymlinks: {}\n",
        record.path,
        record.kind,
        format_size(totals.total_size),
        totals.file_count,
        totals.symlink_count
    );
    for (class, bucket) in totals.histogram.buckets() {
        lines.push_str(&format!(
            "  {:<4} {:>10} files {:>12}\n",
            class.label(),
            bucket.count,
            format_size(bucket.bytes)
        ));
    }
    lines
}

fn resource_lines(usage: &ResourceUsage, peak_permits: usize) -> String {
    format!(
        "\n======= Resource Usage =======\nDuration: {:?}\nMax process memory: {}\nMax active tasks: {}\nMax permits held: {peak_permits}\n",
        Duration::from_millis(usage.duration_ms),
        format_size(usage.peak_memory_bytes),
        usage.peak_active_tasks
    )
}

/// Render the scan summary as JSON
#[must_use]
pub fn format_json(report: &ScanReport, top: &[NodeRecord]) -> String {
    let output = serde_json::json!({
        "root": report.root,
        "record": report.root_record,
        "records_emitted": report.records_emitted,
        "drain": report.drain,
        "skipped": report.walk,
        "resources": report.resources,
        "peak_permits": report.peak_permits,
        "largest_directories": if top.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::json!(top)
        }
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}
