//! Special-file creation for resolved device paths.
//!
//! Table paths are absolute (`/dev/sda1`) and are placed under a configurable
//! root, `/` on a live system.

use core_types::{DeviceClass, DeviceNumber, ScanMode};
use log::{debug, error};
use nix::sys::stat::{makedev, mknod, Mode, SFlag};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Permission bits a node is created with.
pub const NODE_CREATE_MODE: u32 = 0o600;

/// Permission bits a node ends up with: owner and group read/write.
pub const NODE_MODE: u32 = 0o660;

/// Permission bits for parent directories created on demand.
pub const DIR_MODE: u32 = 0o750;

/// Creates a single special file.
///
/// Implementations must fail with [`io::ErrorKind::NotFound`] when a parent
/// directory is missing; the materializer relies on it to create the
/// directory chain and retry.
pub trait NodeFactory {
    fn create_node(
        &self,
        path: &Path,
        class: DeviceClass,
        number: DeviceNumber,
        mode: u32,
    ) -> io::Result<()>;
}

/// Creates real device nodes with `mknod(2)`. Needs `CAP_MKNOD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MknodFactory;

impl NodeFactory for MknodFactory {
    fn create_node(
        &self,
        path: &Path,
        class: DeviceClass,
        number: DeviceNumber,
        mode: u32,
    ) -> io::Result<()> {
        let kind = match class {
            DeviceClass::Char => SFlag::S_IFCHR,
            DeviceClass::Block => SFlag::S_IFBLK,
        };
        let perm = Mode::from_bits_truncate(mode as nix::libc::mode_t);
        let dev = makedev(u64::from(number.major), u64::from(number.minor));
        mknod(path, kind, perm, dev).map_err(io::Error::from)
    }
}

/// Result of a successful materialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// The node was (re)created
    Created,
    /// Update-only mode found an existing entry and left it alone
    AlreadyPresent,
    /// Nothing to create for an empty path
    NoPath,
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to create special file: {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to chmod special file: {}: {source}", path.display())]
    ChmodFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MaterializeError {
    /// Process exit code reported by the `mk*` commands.
    pub fn exit_code(&self) -> i32 {
        match self {
            MaterializeError::CreateFailed { .. } => 12,
            MaterializeError::ChmodFailed { .. } => 13,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            MaterializeError::CreateFailed { path, .. }
            | MaterializeError::ChmodFailed { path, .. } => path,
        }
    }
}

/// Creates or refreshes special files under a root directory.
#[derive(Debug, Clone)]
pub struct NodeMaterializer<F = MknodFactory> {
    factory: F,
    dev_root: PathBuf,
}

impl NodeMaterializer<MknodFactory> {
    /// Materializer for the live system: real nodes under `/`.
    pub fn system() -> Self {
        Self::new(MknodFactory, "/")
    }
}

impl<F: NodeFactory> NodeMaterializer<F> {
    pub fn new(factory: F, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            factory,
            dev_root: dev_root.into(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    /// Maps a table path onto the filesystem under the root.
    pub fn target_path(&self, path: &str) -> PathBuf {
        self.dev_root.join(path.trim_start_matches('/'))
    }

    /// Makes the node at `path` match `class` and `number`.
    ///
    /// In [`ScanMode::UpdateOnly`] any existing entry is kept as is. Otherwise
    /// the entry is removed and recreated, then given [`NODE_MODE`].
    pub fn materialize(
        &self,
        path: &str,
        class: DeviceClass,
        number: DeviceNumber,
        mode: ScanMode,
    ) -> Result<NodeOutcome, MaterializeError> {
        if path.is_empty() {
            return Ok(NodeOutcome::NoPath);
        }

        let target = self.target_path(path);

        if mode.is_update_only() && fs::metadata(&target).is_ok() {
            debug!("{} already exists, leaving it", target.display());
            return Ok(NodeOutcome::AlreadyPresent);
        }

        if let Err(err) = fs::remove_file(&target) {
            if err.kind() != io::ErrorKind::NotFound {
                debug!("Could not remove {}: {}", target.display(), err);
            }
        }

        if let Err(err) = self.create(&target, class, number) {
            error!("{}", err);
            return Err(err);
        }

        if let Err(source) = fs::set_permissions(&target, fs::Permissions::from_mode(NODE_MODE)) {
            let err = MaterializeError::ChmodFailed {
                path: target,
                source,
            };
            error!("{}", err);
            return Err(err);
        }

        debug!("Created {} {} at {}", class, number, target.display());
        Ok(NodeOutcome::Created)
    }

    fn create(
        &self,
        target: &Path,
        class: DeviceClass,
        number: DeviceNumber,
    ) -> Result<(), MaterializeError> {
        match self.factory.create_node(target, class, number, NODE_CREATE_MODE) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = target.parent() {
                    if let Err(err) = fs::DirBuilder::new()
                        .recursive(true)
                        .mode(DIR_MODE)
                        .create(parent)
                    {
                        debug!("Could not create {}: {}", parent.display(), err);
                    }
                }
            }
            Err(source) => {
                return Err(MaterializeError::CreateFailed {
                    path: target.to_path_buf(),
                    source,
                })
            }
        }

        self.factory
            .create_node(target, class, number, NODE_CREATE_MODE)
            .map_err(|source| MaterializeError::CreateFailed {
                path: target.to_path_buf(),
                source,
            })
    }
}
