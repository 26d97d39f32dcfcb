//! # Core Types
//!
//! This crate defines the fundamental types shared by every devmm2name crate.
//!
//! ## Key Types
//!
//! - [`DeviceClass`]: Character or block device
//! - [`DeviceNumber`]: A kernel major/minor pair
//! - [`ScanMode`]: Overwrite or update-only node creation
//!
//! The ceilings below bound every table lookup. Numbers at or above them never
//! resolve to a name.

pub mod ids;
pub mod mode;

pub use ids::{DeviceClass, DeviceNumber, DeviceNumberParseError};
pub use mode::ScanMode;

/// Number of majors a class table can hold.
pub const MAX_MAJOR: u32 = 512;

/// Number of minor slots per major.
pub const MAX_MINOR: u32 = 256;

/// Smallest span an auto-repeat family may cover.
///
/// A marker placed later than `MAX_MINOR - MIN_PERMITTED_AUTOREPEAT` cannot
/// fit its family and marks the table as malformed.
pub const MIN_PERMITTED_AUTOREPEAT: u32 = 4;
