//! # Registry Scanner Service
//!
//! Walks the kernel's live device registry (`/sys/dev/char`, `/sys/dev/block`)
//! and creates a special file for every device the name decoder knows.
//!
//! Registry entries are named `<major>:<minor>`. Entries that do not parse are
//! skipped. A failure on one entry never stops the scan; it is logged and
//! recorded in the [`ScanReport`].

use core_types::{DeviceClass, DeviceNumber, ScanMode};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use services_name_decoder::NameDecoder;
use services_node_materializer::{MknodFactory, NodeFactory, NodeMaterializer, NodeOutcome};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where sysfs is mounted on a live system.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to open '{}': {source}", path.display())]
    RegistryOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A registry entry whose node could not be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub number: DeviceNumber,
    pub path: String,
    pub reason: String,
}

/// What one scan of one class did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub class: DeviceClass,
    pub mode: ScanMode,
    /// Paths (re)created
    pub created: Vec<String>,
    /// Paths left alone because they already existed
    pub present: Vec<String>,
    /// Live devices with no name
    pub unresolved: Vec<DeviceNumber>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    fn new(class: DeviceClass, mode: ScanMode) -> Self {
        Self {
            class,
            mode,
            created: Vec::new(),
            present: Vec::new(),
            unresolved: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Number of registry entries the scan visited.
    pub fn visited(&self) -> usize {
        self.created.len() + self.present.len() + self.unresolved.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Synchronizes special files with the live device registry.
pub struct RegistryScanner<F = MknodFactory> {
    decoder: NameDecoder,
    materializer: NodeMaterializer<F>,
    sysfs_root: PathBuf,
}

impl<F: NodeFactory> RegistryScanner<F> {
    pub fn new(
        decoder: NameDecoder,
        materializer: NodeMaterializer<F>,
        sysfs_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            decoder,
            materializer,
            sysfs_root: sysfs_root.into(),
        }
    }

    pub fn decoder(&self) -> &NameDecoder {
        &self.decoder
    }

    pub fn materializer(&self) -> &NodeMaterializer<F> {
        &self.materializer
    }

    pub fn sysfs_root(&self) -> &Path {
        &self.sysfs_root
    }

    /// Registry directory for `class`, e.g. `/sys/dev/block`.
    pub fn registry_dir(&self, class: DeviceClass) -> PathBuf {
        self.sysfs_root.join("dev").join(class.registry_dir())
    }

    /// Lists the live device numbers of `class` in ascending order.
    pub fn live_devices(&self, class: DeviceClass) -> Result<Vec<DeviceNumber>, ScanError> {
        let dir = self.registry_dir(class);
        let entries = fs::read_dir(&dir).map_err(|source| ScanError::RegistryOpen {
            path: dir.clone(),
            source,
        })?;

        let mut numbers = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry in {}: {}", dir.display(), err);
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match name.parse::<DeviceNumber>() {
                Ok(number) => numbers.push(number),
                Err(err) => debug!("Skipping {} entry {:?}: {}", class, name, err),
            }
        }

        numbers.sort();
        Ok(numbers)
    }

    /// Creates nodes for every live device of `class`.
    pub fn scan(&self, class: DeviceClass, mode: ScanMode) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::new(class, mode);

        for number in self.live_devices(class)? {
            let Some(path) = self.decoder.resolve(class, number) else {
                report.unresolved.push(number);
                continue;
            };

            match self.materializer.materialize(&path, class, number, mode) {
                Ok(NodeOutcome::Created) => report.created.push(path),
                Ok(NodeOutcome::AlreadyPresent) => report.present.push(path),
                Ok(NodeOutcome::NoPath) => report.unresolved.push(number),
                Err(err) => report.failures.push(ScanFailure {
                    number,
                    path,
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            "Scanned {}: {} created, {} present, {} unresolved, {} failed",
            class,
            report.created.len(),
            report.present.len(),
            report.unresolved.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Scans character devices, then block devices.
    ///
    /// A class whose registry cannot be opened is logged and left out of the
    /// result; the other class is still scanned.
    pub fn scan_all(&self, mode: ScanMode) -> Vec<ScanReport> {
        DeviceClass::ALL
            .iter()
            .filter_map(|class| match self.scan(*class, mode) {
                Ok(report) => Some(report),
                Err(err) => {
                    error!("{}", err);
                    None
                }
            })
            .collect()
    }
}
