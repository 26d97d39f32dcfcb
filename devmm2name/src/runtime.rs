//! # Device Runtime
//!
//! Ties the decoder, the materializer and the registry scanner together and
//! executes parsed commands.

use crate::commands::Command;
use core_types::{DeviceClass, DeviceNumber, ScanMode};
use log::{info, warn, LevelFilter};
use services_name_decoder::{DecoderConfig, NameDecoder};
use services_node_materializer::{
    MaterializeError, MknodFactory, NodeFactory, NodeMaterializer,
};
use services_registry_scanner::{RegistryScanner, ScanReport, DEFAULT_SYSFS_ROOT};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Major whose minors all name `/dev/mtdblock<minor>`
pub const MTDBLOCK_MAJOR_ENV: &str = "DEVMM2NAME_MTDBLOCK_MAJOR";

/// Where sysfs is mounted
pub const SYSFS_ROOT_ENV: &str = "DEVMM2NAME_SYSFS_ROOT";

/// Root under which table paths are created
pub const DEV_ROOT_ENV: &str = "DEVMM2NAME_DEV_ROOT";

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_NO_MATCH: i32 = 2;

/// Runtime error types
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("No device name matches")]
    NoMatch,

    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

impl RuntimeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::NoMatch => EXIT_NO_MATCH,
            RuntimeError::Materialize(err) => err.exit_code(),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Decoder settings
    pub decoder: DecoderConfig,
    /// Mount point of sysfs
    pub sysfs_root: PathBuf,
    /// Root under which nodes are created
    pub dev_root: PathBuf,
    /// Logger level
    pub log_level: LevelFilter,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            dev_root: PathBuf::from("/"),
            log_level: services_logger::DEFAULT_LEVEL,
        }
    }
}

/// An environment setting that was present but unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSetting {
    pub key: &'static str,
    pub value: String,
}

impl RuntimeConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> (Self, Vec<RejectedSetting>) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup.
    ///
    /// Unset or empty values keep their defaults. Invalid values keep them
    /// too and are returned so they can be reported once logging is up.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> (Self, Vec<RejectedSetting>) {
        let mut config = Self::default();
        let mut rejected = Vec::new();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(major) = value(MTDBLOCK_MAJOR_ENV) {
            config.decoder.mtdblock_major = DecoderConfig::parse_mtdblock_major(&major);
            if config.decoder.mtdblock_major.is_none() && major.trim() != "0" {
                rejected.push(RejectedSetting {
                    key: MTDBLOCK_MAJOR_ENV,
                    value: major,
                });
            }
        }
        if let Some(root) = value(SYSFS_ROOT_ENV) {
            config.sysfs_root = PathBuf::from(root);
        }
        if let Some(root) = value(DEV_ROOT_ENV) {
            config.dev_root = PathBuf::from(root);
        }
        if let Some(level) = value(services_logger::LOG_LEVEL_ENV) {
            match services_logger::parse_level(&level) {
                Some(level) => config.log_level = level,
                None => rejected.push(RejectedSetting {
                    key: services_logger::LOG_LEVEL_ENV,
                    value: level,
                }),
            }
        }

        (config, rejected)
    }
}

/// Watch loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Pause between update passes, at least one second
    pub interval: Duration,
    /// Update passes to run (0 = unlimited)
    pub max_passes: usize,
}

impl WatchConfig {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval: Duration::from_secs(u64::from(interval_secs.max(1))),
            max_passes: 0,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(crate::commands::DEFAULT_WATCH_INTERVAL_SECS)
    }
}

/// Device runtime
pub struct DeviceRuntime<F = MknodFactory> {
    scanner: RegistryScanner<F>,
    passes: usize,
}

impl DeviceRuntime<MknodFactory> {
    /// Runtime creating real device nodes
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_factory(config, MknodFactory)
    }
}

impl<F: NodeFactory> DeviceRuntime<F> {
    /// Runtime with the built-in table and a custom node factory
    pub fn with_factory(config: &RuntimeConfig, factory: F) -> Self {
        Self::from_scanner(RegistryScanner::new(
            NameDecoder::builtin(config.decoder),
            NodeMaterializer::new(factory, config.dev_root.clone()),
            config.sysfs_root.clone(),
        ))
    }

    pub fn from_scanner(scanner: RegistryScanner<F>) -> Self {
        Self { scanner, passes: 0 }
    }

    pub fn scanner(&self) -> &RegistryScanner<F> {
        &self.scanner
    }

    /// Scan passes run so far, the initial overwrite pass included
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Resolves the path of a device
    pub fn lookup(
        &self,
        class: Option<DeviceClass>,
        number: DeviceNumber,
    ) -> Result<String, RuntimeError> {
        class
            .and_then(|class| self.scanner.decoder().resolve(class, number))
            .ok_or(RuntimeError::NoMatch)
    }

    /// Creates the special file of a device, replacing any existing entry
    pub fn make_node(
        &self,
        class: Option<DeviceClass>,
        number: DeviceNumber,
    ) -> Result<(), RuntimeError> {
        let class = class.ok_or(RuntimeError::NoMatch)?;
        let path = self.lookup(Some(class), number)?;
        self.scanner
            .materializer()
            .materialize(&path, class, number, ScanMode::Overwrite)?;
        Ok(())
    }

    /// Runs one pass over both device classes
    pub fn scan(&mut self, mode: ScanMode) -> Vec<ScanReport> {
        self.passes += 1;
        self.scanner.scan_all(mode)
    }

    /// Overwrites every node, then keeps adding missing ones.
    ///
    /// Returns only once `max_passes` update passes have run.
    pub fn watch(&mut self, config: WatchConfig) {
        info!(
            "Watching devices every {}s",
            config.interval.as_secs()
        );
        self.scan(ScanMode::Overwrite);

        let mut update_passes = 0;
        while config.max_passes == 0 || update_passes < config.max_passes {
            thread::sleep(config.interval);
            self.scan(ScanMode::UpdateOnly);
            update_passes += 1;
        }
    }

    /// Executes a command and returns the process exit code
    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> i32 {
        let result = match command {
            Command::Lookup { class, number } => {
                self.lookup(class, number).map(|path| {
                    if let Err(err) = writeln!(out, "{}", path) {
                        warn!("Failed to write path: {}", err);
                    }
                })
            }
            Command::MakeNode { class, number } => self.make_node(class, number),
            Command::Scan => {
                self.scan(ScanMode::Overwrite);
                Ok(())
            }
            Command::Update => {
                self.scan(ScanMode::UpdateOnly);
                Ok(())
            }
            Command::Watch { interval_secs } => {
                self.watch(WatchConfig::new(interval_secs));
                Ok(())
            }
        };

        match result {
            Ok(()) => EXIT_OK,
            Err(err) => err.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn config_from(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned()).0
    }

    fn rejected_from(vars: &[(&str, &str)]) -> Vec<RejectedSetting> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned()).1
    }

    fn missing_roots() -> RuntimeConfig {
        RuntimeConfig {
            sysfs_root: PathBuf::from("/nonexistent/devmm2name/sys"),
            dev_root: PathBuf::from("/nonexistent/devmm2name/root"),
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.decoder.mtdblock_major, None);
        assert_eq!(config.sysfs_root, Path::new("/sys"));
        assert_eq!(config.dev_root, Path::new("/"));
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = config_from(&[
            (MTDBLOCK_MAJOR_ENV, "31"),
            (SYSFS_ROOT_ENV, "/tmp/sys"),
            (DEV_ROOT_ENV, "/tmp/root"),
            ("DEVMM2NAME_LOG", "debug"),
        ]);
        assert_eq!(config.decoder.mtdblock_major, Some(31));
        assert_eq!(config.sysfs_root, Path::new("/tmp/sys"));
        assert_eq!(config.dev_root, Path::new("/tmp/root"));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_config_invalid_values_keep_defaults() {
        let config = config_from(&[
            (MTDBLOCK_MAJOR_ENV, "zero"),
            (SYSFS_ROOT_ENV, ""),
            ("DEVMM2NAME_LOG", "loud"),
        ]);
        assert_eq!(config, RuntimeConfig::default());

        let config = config_from(&[(MTDBLOCK_MAJOR_ENV, "0")]);
        assert_eq!(config.decoder.mtdblock_major, None);
    }

    #[test]
    fn test_config_reports_rejected_values() {
        let rejected = rejected_from(&[
            (MTDBLOCK_MAJOR_ENV, "zero"),
            ("DEVMM2NAME_LOG", "loud"),
            (SYSFS_ROOT_ENV, "/tmp/sys"),
        ]);
        assert_eq!(
            rejected,
            vec![
                RejectedSetting {
                    key: MTDBLOCK_MAJOR_ENV,
                    value: "zero".to_string(),
                },
                RejectedSetting {
                    key: "DEVMM2NAME_LOG",
                    value: "loud".to_string(),
                },
            ]
        );

        assert!(rejected_from(&[(MTDBLOCK_MAJOR_ENV, "0"), ("DEVMM2NAME_LOG", "info")]).is_empty());
        assert!(rejected_from(&[]).is_empty());
    }

    #[test]
    fn test_watch_config_clamps_interval() {
        assert_eq!(WatchConfig::new(0).interval, Duration::from_secs(1));
        assert_eq!(WatchConfig::new(30).interval, Duration::from_secs(30));
        assert_eq!(WatchConfig::default().interval, Duration::from_secs(10));
        assert_eq!(WatchConfig::default().max_passes, 0);
        assert_eq!(WatchConfig::new(5).with_max_passes(2).max_passes, 2);
    }

    #[test]
    fn test_lookup_writes_path() {
        let mut runtime = DeviceRuntime::new(&missing_roots());
        let mut out = Vec::new();

        let code = runtime.execute(
            Command::Lookup {
                class: Some(DeviceClass::Block),
                number: DeviceNumber::new(8, 1),
            },
            &mut out,
        );

        assert_eq!(code, EXIT_OK);
        assert_eq!(String::from_utf8(out).unwrap(), "/dev/sda1\n");
    }

    #[test]
    fn test_lookup_without_class_is_no_match() {
        let mut runtime = DeviceRuntime::new(&missing_roots());
        let mut out = Vec::new();

        let code = runtime.execute(
            Command::Lookup {
                class: None,
                number: DeviceNumber::new(8, 1),
            },
            &mut out,
        );

        assert_eq!(code, EXIT_NO_MATCH);
        assert!(out.is_empty());
    }

    #[test]
    fn test_lookup_mtdblock_override() {
        let config = RuntimeConfig {
            decoder: DecoderConfig::with_mtdblock_major(31),
            ..missing_roots()
        };
        let runtime = DeviceRuntime::new(&config);

        assert_eq!(
            runtime
                .lookup(Some(DeviceClass::Block), DeviceNumber::new(31, 3))
                .unwrap(),
            "/dev/mtdblock3"
        );
    }

    #[test]
    fn test_make_node_unknown_device() {
        let mut runtime = DeviceRuntime::new(&missing_roots());
        let mut out = Vec::new();

        let code = runtime.execute(
            Command::MakeNode {
                class: Some(DeviceClass::Char),
                number: DeviceNumber::new(511, 0),
            },
            &mut out,
        );

        assert_eq!(code, EXIT_NO_MATCH);
    }

    #[test]
    fn test_scan_without_registry_succeeds() {
        let mut runtime = DeviceRuntime::new(&missing_roots());
        let mut out = Vec::new();

        assert_eq!(runtime.execute(Command::Scan, &mut out), EXIT_OK);
        assert_eq!(runtime.execute(Command::Update, &mut out), EXIT_OK);
        assert_eq!(runtime.passes(), 2);
        assert!(out.is_empty());
    }
}
