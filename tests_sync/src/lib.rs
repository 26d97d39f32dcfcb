//! Synchronization Test Utilities
//!
//! This crate provides shared fixtures for scanner, materializer and runtime
//! tests.
//!
//! ## Test Philosophy
//!
//! - **No root required**: [`PlaceholderFactory`] writes regular files that
//!   record the device identity instead of calling `mknod`
//! - **Hermetic trees**: every [`FakeRegistry`] lives in its own temporary
//!   directory holding both the sysfs tree and the dev root

use core_types::{DeviceClass, DeviceNumber};
use device_table::{builtin_tables, DeviceTables, Family, MajorTable, TableEntry};
use devmm2name::{DeviceRuntime, RuntimeConfig};
use services_name_decoder::{DecoderConfig, NameDecoder};
use services_node_materializer::{NodeFactory, NodeMaterializer};
use services_registry_scanner::RegistryScanner;
use std::fs;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a regular file holding `"<c|b> <major>:<minor>"` in place of a node.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderFactory;

impl PlaceholderFactory {
    /// Contents written for a device.
    pub fn contents(class: DeviceClass, number: DeviceNumber) -> String {
        format!("{} {}", class.letter(), number)
    }
}

impl NodeFactory for PlaceholderFactory {
    fn create_node(
        &self,
        path: &Path,
        class: DeviceClass,
        number: DeviceNumber,
        mode: u32,
    ) -> io::Result<()> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(path)?;
        fs::write(path, Self::contents(class, number))
    }
}

/// A temporary sysfs tree with a dev root next to it.
///
/// ```text
/// <tmp>/sys/dev/char/<major>:<minor>
/// <tmp>/sys/dev/block/<major>:<minor>
/// <tmp>/root/dev/...
/// ```
pub struct FakeRegistry {
    dir: TempDir,
}

impl FakeRegistry {
    /// Empty registry with both class directories present.
    pub fn new() -> io::Result<Self> {
        let registry = Self {
            dir: tempfile::tempdir()?,
        };
        for class in DeviceClass::ALL {
            fs::create_dir_all(registry.class_dir(class))?;
        }
        fs::create_dir_all(registry.dev_root())?;
        Ok(registry)
    }

    /// Registers live devices of `class`.
    pub fn with_devices(self, class: DeviceClass, numbers: &[(u32, u32)]) -> io::Result<Self> {
        for (major, minor) in numbers {
            self.add(class, DeviceNumber::new(*major, *minor))?;
        }
        Ok(self)
    }

    /// Removes a class directory, as on a kernel without that registry.
    pub fn without_class(self, class: DeviceClass) -> io::Result<Self> {
        fs::remove_dir_all(self.class_dir(class))?;
        Ok(self)
    }

    /// Adds one live device.
    pub fn add(&self, class: DeviceClass, number: DeviceNumber) -> io::Result<()> {
        fs::write(self.class_dir(class).join(number.to_string()), "")
    }

    /// Adds a registry entry with an arbitrary name.
    pub fn add_raw(&self, class: DeviceClass, name: &str) -> io::Result<()> {
        fs::write(self.class_dir(class).join(name), "")
    }

    pub fn sysfs_root(&self) -> PathBuf {
        self.dir.path().join("sys")
    }

    pub fn dev_root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn class_dir(&self, class: DeviceClass) -> PathBuf {
        self.sysfs_root().join("dev").join(class.registry_dir())
    }

    /// Filesystem location of a table path such as `/dev/sda1`.
    pub fn node(&self, path: &str) -> PathBuf {
        self.dev_root().join(path.trim_start_matches('/'))
    }

    /// Reads back a placeholder node.
    pub fn read_node(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.node(path))
    }

    /// Runtime configuration pointing at this tree.
    pub fn config(&self) -> RuntimeConfig {
        RuntimeConfig {
            sysfs_root: self.sysfs_root(),
            dev_root: self.dev_root(),
            ..RuntimeConfig::default()
        }
    }

    /// Scanner over the built-in table.
    pub fn scanner(&self) -> RegistryScanner<PlaceholderFactory> {
        self.scanner_with(NameDecoder::builtin(DecoderConfig::default()))
    }

    pub fn scanner_with(&self, decoder: NameDecoder) -> RegistryScanner<PlaceholderFactory> {
        RegistryScanner::new(
            decoder,
            NodeMaterializer::new(PlaceholderFactory, self.dev_root()),
            self.sysfs_root(),
        )
    }

    pub fn runtime(&self) -> DeviceRuntime<PlaceholderFactory> {
        DeviceRuntime::with_factory(&self.config(), PlaceholderFactory)
    }
}

/// Built-in tables plus a broken char major 240.
///
/// Minor 0 of major 240 is `/dev/broken0`; minor 1 points two slots back,
/// past the start of the table; minor 2 points at the `Named` slot.
pub fn malformed_decoder() -> NameDecoder {
    let builtin = builtin_tables();
    let mut char_table = builtin.class(DeviceClass::Char).clone();

    let broken = MajorTable::from_entries(vec![
        TableEntry::Named("/dev/broken0".to_string()),
        TableEntry::BackReference(2),
        TableEntry::BackReference(2),
        TableEntry::Family(Family::Repeat {
            base: "/dev/fine".to_string(),
            first: 0,
        }),
        TableEntry::BackReference(1),
        TableEntry::BackReference(2),
    ]);
    char_table
        .insert(240, broken)
        .expect("major 240 is unused by the built-in table");

    NameDecoder::new(
        DeviceTables::new(char_table, builtin.class(DeviceClass::Block).clone()),
        DecoderConfig::default(),
    )
}
