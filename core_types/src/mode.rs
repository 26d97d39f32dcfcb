//! Node write modes

use serde::{Deserialize, Serialize};

/// How existing special files are treated when (re)creating nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Remove and recreate every node
    Overwrite,
    /// Leave any existing filesystem entry untouched
    UpdateOnly,
}

impl ScanMode {
    pub fn is_update_only(&self) -> bool {
        matches!(self, ScanMode::UpdateOnly)
    }
}
