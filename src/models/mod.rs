//! Data models for node records, size classes, and run reports

use serde::{Deserialize, Serialize};

/// Parent identifier carried by the scan root.
pub const ROOT_PARENT_ID: u64 = 0;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Filesystem entry kinds that produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::Symlink => "symlink",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "file" => Some(NodeKind::File),
            "directory" => Some(NodeKind::Directory),
            "symlink" => Some(NodeKind::Symlink),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Histogram bucket label for regular files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    S,
    M,
    L,
    XL,
    XXL,
}

impl SizeClass {
    pub const ALL: [SizeClass; 5] = [
        SizeClass::S,
        SizeClass::M,
        SizeClass::L,
        SizeClass::XL,
        SizeClass::XXL,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SizeClass::S => "S",
            SizeClass::M => "M",
            SizeClass::L => "L",
            SizeClass::XL => "XL",
            SizeClass::XXL => "XXL",
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            SizeClass::S => 0,
            SizeClass::M => 1,
            SizeClass::L => 2,
            SizeClass::XL => 3,
            SizeClass::XXL => 4,
        }
    }
}

/// Ascending exclusive upper bounds for S, M, L and XL; everything else is XXL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSizeClassTable")]
pub struct SizeClassTable {
    upper_bounds: [u64; 4],
}

#[derive(Deserialize)]
struct RawSizeClassTable {
    upper_bounds: [u64; 4],
}

impl TryFrom<RawSizeClassTable> for SizeClassTable {
    type Error = String;

    fn try_from(raw: RawSizeClassTable) -> Result<Self, Self::Error> {
        SizeClassTable::new(raw.upper_bounds)
    }
}

impl Default for SizeClassTable {
    fn default() -> Self {
        Self {
            upper_bounds: [MIB, 100 * MIB, GIB, 10 * GIB],
        }
    }
}

impl SizeClassTable {
    /// Build a table, rejecting bounds that are not strictly ascending.
    pub fn new(upper_bounds: [u64; 4]) -> Result<Self, String> {
        let table = Self { upper_bounds };
        table.check()?;
        Ok(table)
    }

    /// Fails unless the bounds are strictly ascending.
    pub fn check(&self) -> Result<(), String> {
        if self.upper_bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "size class bounds must be strictly ascending: {:?}",
                self.upper_bounds
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn upper_bounds(&self) -> [u64; 4] {
        self.upper_bounds
    }

    /// Every size maps to exactly one class.
    #[must_use]
    pub fn classify(&self, size: u64) -> SizeClass {
        self.upper_bounds
            .iter()
            .position(|bound| size < *bound)
            .map_or(SizeClass::XXL, |idx| SizeClass::ALL[idx])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBucket {
    pub count: u64,
    pub bytes: u64,
}

/// Per-class file counts and byte totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHistogram {
    buckets: [SizeBucket; 5],
}

impl SizeHistogram {
    /// Histogram holding a single file of `size` bytes.
    #[must_use]
    pub fn single(class: SizeClass, size: u64) -> Self {
        let mut histogram = Self::default();
        histogram.buckets[class.index()] = SizeBucket {
            count: 1,
            bytes: size,
        };
        histogram
    }

    #[must_use]
    pub fn from_buckets(buckets: [SizeBucket; 5]) -> Self {
        Self { buckets }
    }

    #[must_use]
    pub fn bucket(&self, class: SizeClass) -> SizeBucket {
        self.buckets[class.index()]
    }

    pub fn buckets(&self) -> impl Iterator<Item = (SizeClass, SizeBucket)> + '_ {
        SizeClass::ALL
            .iter()
            .map(move |class| (*class, self.buckets[class.index()]))
    }

    pub fn merge(&mut self, other: &SizeHistogram) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            mine.count = mine.count.saturating_add(theirs.count);
            mine.bytes = mine.bytes.saturating_add(theirs.bytes);
        }
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Aggregated statistics carried by every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_size: u64,
    pub file_count: u64,
    pub symlink_count: u64,
    pub histogram: SizeHistogram,
}

/// Statistics for one visited filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub parent_id: u64,
    pub path: String,
    pub kind: NodeKind,
    pub self_size: u64,
    pub link_target: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl NodeRecord {
    /// A regular file; its own size class is part of its histogram.
    #[must_use]
    pub fn file(id: u64, parent_id: u64, path: String, size: u64, class: SizeClass) -> Self {
        Self {
            id,
            parent_id,
            path,
            kind: NodeKind::File,
            self_size: size,
            link_target: None,
            totals: Totals {
                total_size: size,
                file_count: 0,
                symlink_count: 0,
                histogram: SizeHistogram::single(class, size),
            },
        }
    }

    /// A symlink; `self_size` is the encoded length of the target.
    #[must_use]
    pub fn symlink(id: u64, parent_id: u64, path: String, target: String) -> Self {
        let size = target.len() as u64;
        Self {
            id,
            parent_id,
            path,
            kind: NodeKind::Symlink,
            self_size: size,
            link_target: Some(target),
            totals: Totals {
                total_size: size,
                ..Totals::default()
            },
        }
    }

    /// A directory with zeroed aggregates (plus its own size when counted).
    #[must_use]
    pub fn directory(id: u64, parent_id: u64, path: String, self_size: u64, counted: bool) -> Self {
        Self {
            id,
            parent_id,
            path,
            kind: NodeKind::Directory,
            self_size,
            link_target: None,
            totals: Totals {
                total_size: if counted { self_size } else { 0 },
                ..Totals::default()
            },
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == NodeKind::Symlink
    }
}

/// Peak resource usage sampled during a scan
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub peak_memory_bytes: u64,
    pub peak_active_tasks: u64,
    pub duration_ms: u64,
}
