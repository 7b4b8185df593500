//! SQLite sink committing each batch of records in one transaction.
//!
//! The parent-id index is built only after the stream ends so inserts stay
//! append-only during the walk.

use super::{RecordSink, SinkFinish};
use crate::models::{NodeKind, NodeRecord, SizeBucket, SizeClass, SizeHistogram, Totals};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

const CREATE_NODES_TABLE: &str = r"
CREATE TABLE file_nodes (
    id INTEGER PRIMARY KEY,
    parent_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    kind TEXT NOT NULL,
    self_size INTEGER NOT NULL,
    link_target TEXT,
    total_size INTEGER NOT NULL,
    file_count INTEGER NOT NULL,
    symlink_count INTEGER NOT NULL,
    s_file_count INTEGER NOT NULL,
    s_file_size INTEGER NOT NULL,
    m_file_count INTEGER NOT NULL,
    m_file_size INTEGER NOT NULL,
    l_file_count INTEGER NOT NULL,
    l_file_size INTEGER NOT NULL,
    xl_file_count INTEGER NOT NULL,
    xl_file_size INTEGER NOT NULL,
    xxl_file_count INTEGER NOT NULL,
    xxl_file_size INTEGER NOT NULL
)
";

const CREATE_INFO_TABLE: &str = r"
CREATE TABLE scan_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
";

const INSERT_NODE: &str = r"
INSERT INTO file_nodes (
    id, parent_id, path, kind, self_size, link_target,
    total_size, file_count, symlink_count,
    s_file_count, s_file_size, m_file_count, m_file_size,
    l_file_count, l_file_size, xl_file_count, xl_file_size,
    xxl_file_count, xxl_file_size
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
";

const SELECT_NODE_COLUMNS: &str = r"
SELECT id, parent_id, path, kind, self_size, link_target,
       total_size, file_count, symlink_count,
       s_file_count, s_file_size, m_file_count, m_file_size,
       l_file_count, l_file_size, xl_file_count, xl_file_size,
       xxl_file_count, xxl_file_size
FROM file_nodes
";

const CREATE_PARENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_file_nodes_parent_id ON file_nodes(parent_id)";

const WRITE_PRAGMAS: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
";

/// Keys stored in the `scan_info` table
pub mod keys {
    pub const ROOT: &str = "root";
    pub const STATUS: &str = "status";
    pub const STARTED_AT: &str = "started_at";
    pub const VERSION: &str = "fsstat_version";
}

pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
    persisted: u64,
    batches: u64,
}

impl SqliteSink {
    /// Create a fresh database. Fails if `file_nodes` already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(WRITE_PRAGMAS)?;
        conn.execute(CREATE_NODES_TABLE, [])?;
        conn.execute(CREATE_INFO_TABLE, [])?;

        let sink = Self {
            conn,
            path: path.to_path_buf(),
            persisted: 0,
            batches: 0,
        };
        sink.set_info(keys::VERSION, env!("CARGO_PKG_VERSION"))?;
        sink.set_info(keys::STATUS, "running")?;
        log::info!("Created database at {}", sink.path.display());
        Ok(sink)
    }

    pub fn set_info(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO scan_info (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for SqliteSink {
    fn write_batch(&mut self, batch: &[NodeRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Dropping an uncommitted transaction rolls it back.
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_NODE)?;
            for record in batch {
                let hist = &record.totals.histogram;
                let s = hist.bucket(SizeClass::S);
                let m = hist.bucket(SizeClass::M);
                let l = hist.bucket(SizeClass::L);
                let xl = hist.bucket(SizeClass::XL);
                let xxl = hist.bucket(SizeClass::XXL);

                stmt.execute(params![
                    sql_int(record.id),
                    sql_int(record.parent_id),
                    record.path,
                    record.kind.as_str(),
                    sql_int(record.self_size),
                    record.link_target,
                    sql_int(record.totals.total_size),
                    sql_int(record.totals.file_count),
                    sql_int(record.totals.symlink_count),
                    sql_int(s.count),
                    sql_int(s.bytes),
                    sql_int(m.count),
                    sql_int(m.bytes),
                    sql_int(l.count),
                    sql_int(l.bytes),
                    sql_int(xl.count),
                    sql_int(xl.bytes),
                    sql_int(xxl.count),
                    sql_int(xxl.bytes),
                ])
                .map_err(|e| {
                    Error::Persistence(format!("insert of {} (id {}) failed: {e}", record.path, record.id))
                })?;
            }
        }
        tx.commit()?;

        self.persisted = self.persisted.saturating_add(batch.len() as u64);
        self.batches = self.batches.saturating_add(1);
        log::debug!("Committed batch of {} records", batch.len());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<SinkFinish> {
        log::info!("Building parent id index on {}", self.path.display());
        self.conn.execute(CREATE_PARENT_INDEX, [])?;
        self.set_info(keys::STATUS, "completed")?;
        Ok(SinkFinish::new(Vec::new(), self.persisted, self.batches, true))
    }
}

/// Directories ordered by aggregated size, largest first.
pub fn largest_directories<P: AsRef<Path>>(path: P, limit: usize) -> Result<Vec<NodeRecord>> {
    let conn = Connection::open(path)?;
    let sql = format!(
        "{SELECT_NODE_COLUMNS} WHERE kind = 'directory' ORDER BY total_size DESC, id ASC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![limit], record_from_row)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Look up a single record by path.
pub fn find_by_path<P: AsRef<Path>>(path: P, node_path: &str) -> Result<Option<NodeRecord>> {
    let conn = Connection::open(path)?;
    let sql = format!("{SELECT_NODE_COLUMNS} WHERE path = ?1");
    let record = conn
        .query_row(&sql, params![node_path], record_from_row)
        .optional()?;
    Ok(record)
}

/// Number of stored records.
pub fn count_records<P: AsRef<Path>>(path: P) -> Result<u64> {
    let conn = Connection::open(path)?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM file_nodes", [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    let kind_label: String = row.get(3)?;
    let kind = NodeKind::from_label(&kind_label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown node kind '{kind_label}'").into(),
        )
    })?;

    let mut buckets = [SizeBucket::default(); 5];
    for (idx, bucket) in buckets.iter_mut().enumerate() {
        bucket.count = u64_col(row, 9 + idx * 2)?;
        bucket.bytes = u64_col(row, 10 + idx * 2)?;
    }

    Ok(NodeRecord {
        id: u64_col(row, 0)?,
        parent_id: u64_col(row, 1)?,
        path: row.get(2)?,
        kind,
        self_size: u64_col(row, 4)?,
        link_target: row.get(5)?,
        totals: Totals {
            total_size: u64_col(row, 6)?,
            file_count: u64_col(row, 7)?,
            symlink_count: u64_col(row, 8)?,
            histogram: SizeHistogram::from_buckets(buckets),
        },
    })
}

fn u64_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    Ok(u64::try_from(value).unwrap_or(0))
}

fn sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
