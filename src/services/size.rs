//! Size computation (logical and physical) with platform-specific implementations

use serde::{Deserialize, Serialize};
use std::fs::Metadata;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBasis {
    /// Apparent length reported by the filesystem
    #[default]
    Logical,
    /// Allocated blocks
    Physical,
}

impl SizeBasis {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeBasis::Logical => "logical",
            SizeBasis::Physical => "physical",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "logical" => Some(SizeBasis::Logical),
            "physical" => Some(SizeBasis::Physical),
            _ => None,
        }
    }

    /// Size of an entry under this basis
    #[must_use]
    pub fn size_of(&self, metadata: &Metadata) -> u64 {
        match self {
            SizeBasis::Logical => logical_size(metadata),
            SizeBasis::Physical => physical_size(metadata),
        }
    }
}

/// Compute logical size from metadata
#[must_use]
pub fn logical_size(metadata: &Metadata) -> u64 {
    metadata.len()
}

/// Compute physical size from metadata (Unix platform)
/// Uses the number of 512-byte blocks allocated to the file
#[cfg(unix)]
#[must_use]
pub fn physical_size(metadata: &Metadata) -> u64 {
    metadata.blocks() * 512
}

/// Compute physical size (non-Unix fallback)
#[cfg(not(unix))]
#[must_use]
pub fn physical_size(metadata: &Metadata) -> u64 {
    logical_size(metadata)
}
