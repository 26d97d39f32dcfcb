//! # devmm2name
//!
//! Maps kernel device numbers to `/dev` paths and keeps the special files
//! under `/dev` in step with the live device registry.
//!
//! ## Responsibilities
//!
//! - Print the path of a single device
//! - Create the special file of a single device
//! - Scan the registry once, overwriting or only adding nodes
//! - Watch the registry, adding nodes for devices as they appear
//!
//! ## Non-Responsibilities
//!
//! The runtime does NOT:
//! - Remove nodes of departed devices
//! - Listen for hotplug events
//! - Read naming rules from configuration files

pub mod commands;
pub mod runtime;

pub use commands::{Command, CommandError, CommandParser, DEFAULT_WATCH_INTERVAL_SECS};
pub use runtime::{
    DeviceRuntime, RejectedSetting, RuntimeConfig, RuntimeError, WatchConfig, EXIT_NO_MATCH,
    EXIT_OK, EXIT_USAGE,
};
