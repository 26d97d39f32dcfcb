//! # Name Decoder Service
//!
//! Resolves a device class and major/minor number to its `/dev` path.
//!
//! ## Resolution
//!
//! - Numbers at or above the table ceilings never resolve.
//! - A configured mtdblock major overrides every table: any minor `n` under it
//!   resolves to `/dev/mtdblock<n>`.
//! - A [`Family`] marker resolves as offset 0 of its family.
//! - A back-reference walks back to its marker and resolves with the distance
//!   walked as the offset.
//! - A named slot resolves to itself.
//!
//! Every lookup returns an owned path; the decoder holds no mutable state.

use core_types::{DeviceClass, DeviceNumber, MAX_MINOR, MIN_PERMITTED_AUTOREPEAT};
use device_table::{builtin_tables, DeviceTables, Family, MajorTable, TableEntry};
use log::error;
use thiserror::Error;

/// Decoder settings fixed at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Major whose minors all resolve to `/dev/mtdblock<minor>`
    pub mtdblock_major: Option<u32>,
}

impl DecoderConfig {
    /// Enables the mtdblock override for `major`. Zero disables it.
    pub fn with_mtdblock_major(major: u32) -> Self {
        Self {
            mtdblock_major: (major != 0).then_some(major),
        }
    }

    /// Parses an mtdblock major setting. Only nonzero integers enable it.
    pub fn parse_mtdblock_major(value: &str) -> Option<u32> {
        value.trim().parse().ok().filter(|major| *major != 0)
    }
}

/// Malformed-table conditions found during a lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Table definition is invalid: {class} {number} refers to a marker at minor {marker}, past the last usable slot")]
    MarkerOutOfRange {
        class: DeviceClass,
        number: DeviceNumber,
        marker: u32,
    },

    #[error("Table definition is invalid: {class} {number} refers back {distance} slots, before minor 0")]
    WalkUnderflow {
        class: DeviceClass,
        number: DeviceNumber,
        distance: u32,
    },

    #[error("Table definition is invalid: {class} {number} numbers past the limit of the family at minor {marker}")]
    NumberOverflow {
        class: DeviceClass,
        number: DeviceNumber,
        marker: u32,
    },

    #[error("Table definition is invalid: {class} {number} refers to minor {marker}, which is not an auto-repeat marker")]
    NotAMarker {
        class: DeviceClass,
        number: DeviceNumber,
        marker: u32,
    },
}

/// Expands one member of a family.
///
/// Returns `None` when the member's number does not fit in a `u32`.
pub fn expand(family: &Family, offset: u32) -> Option<String> {
    let name = match family {
        Family::Repeat { base, first } => format!("{}{}", base, first.checked_add(offset)?),
        Family::Storage { base, first } if offset == 0 => format!("{}{}", base, first),
        Family::Storage { base, first } => format!("{}{}{}", base, first, offset),
        Family::StoragePartition { base, first } if offset == 0 => format!("{}{}", base, first),
        Family::StoragePartition { base, first } => format!("{}{}p{}", base, first, offset),
    };
    Some(name)
}

/// Table-driven device name decoder
#[derive(Debug, Clone)]
pub struct NameDecoder {
    tables: DeviceTables,
    config: DecoderConfig,
}

impl NameDecoder {
    pub fn new(tables: DeviceTables, config: DecoderConfig) -> Self {
        Self { tables, config }
    }

    /// Creates a decoder over the built-in tables.
    pub fn builtin(config: DecoderConfig) -> Self {
        Self::new(builtin_tables(), config)
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Resolves a device to its path.
    ///
    /// A malformed table is logged and degrades to an empty path, so a batch
    /// of lookups keeps going.
    pub fn resolve(&self, class: DeviceClass, number: DeviceNumber) -> Option<String> {
        match self.try_resolve(class, number) {
            Ok(path) => path,
            Err(err) => {
                error!("{}", err);
                Some(String::new())
            }
        }
    }

    /// Resolves a device to its path, reporting malformed tables.
    pub fn try_resolve(
        &self,
        class: DeviceClass,
        number: DeviceNumber,
    ) -> Result<Option<String>, DecodeError> {
        if !number.in_range() {
            return Ok(None);
        }

        if self.config.mtdblock_major == Some(number.major) {
            return Ok(Some(format!("/dev/mtdblock{}", number.minor)));
        }

        let Some(table) = self.tables.major(class, number.major) else {
            return Ok(None);
        };

        match table.get(number.minor) {
            None | Some(TableEntry::Blank) => Ok(None),
            Some(TableEntry::Named(path)) => Ok(Some(path.clone())),
            Some(TableEntry::Family(_)) => {
                expand_at(table, class, number, number.minor, 0).map(Some)
            }
            Some(TableEntry::BackReference(distance)) => {
                let distance = *distance;
                let marker = number.minor.checked_sub(distance).ok_or(
                    DecodeError::WalkUnderflow {
                        class,
                        number,
                        distance,
                    },
                )?;
                expand_at(table, class, number, marker, distance).map(Some)
            }
        }
    }
}

fn expand_at(
    table: &MajorTable,
    class: DeviceClass,
    number: DeviceNumber,
    marker: u32,
    offset: u32,
) -> Result<String, DecodeError> {
    if marker > MAX_MINOR - MIN_PERMITTED_AUTOREPEAT {
        return Err(DecodeError::MarkerOutOfRange {
            class,
            number,
            marker,
        });
    }

    match table.get(marker) {
        Some(TableEntry::Family(family)) => {
            expand(family, offset).ok_or(DecodeError::NumberOverflow {
                class,
                number,
                marker,
            })
        }
        _ => Err(DecodeError::NotAMarker {
            class,
            number,
            marker,
        }),
    }
}
