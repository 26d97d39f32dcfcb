//! # Device Name Tables
//!
//! Per-class, per-major arrays of minor slots that name device special files.
//!
//! Most majors enumerate their minors structurally (`loop0`, `loop1`, ...,
//! `sda`, `sda1`, ..., `mmcblk0p1`, ...). Instead of storing one string per
//! minor, such runs are stored as a [`Family`] marker followed by
//! [`TableEntry::BackReference`] slots that point back at it. The decoder
//! expands them on lookup.
//!
//! Tables are built once (see [`MajorTableBuilder`] and [`builtin_tables`])
//! and never mutated afterwards.

pub mod builder;
pub mod builtin;

pub use builder::{next_disk_id, MajorTableBuilder};
pub use builtin::{build_builtin, builtin_tables};

use core_types::{DeviceClass, MAX_MAJOR, MAX_MINOR, MIN_PERMITTED_AUTOREPEAT};
use std::collections::BTreeMap;
use thiserror::Error;

/// An auto-repeat family stored at its marker slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Family {
    /// `base + (first + offset)`, e.g. `/dev/ttyS0`, `/dev/ttyS1`
    Repeat { base: String, first: u32 },
    /// `base + first` then `base + first + offset`, e.g. `/dev/sda`, `/dev/sda1`
    Storage { base: String, first: String },
    /// `base + first` then `base + first + "p" + offset`, e.g. `/dev/mmcblk0p1`
    StoragePartition { base: String, first: u32 },
}

impl Family {
    /// Returns the shared path prefix of the family.
    pub fn base(&self) -> &str {
        match self {
            Family::Repeat { base, .. }
            | Family::Storage { base, .. }
            | Family::StoragePartition { base, .. } => base,
        }
    }
}

/// One minor slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TableEntry {
    /// No device at this minor
    #[default]
    Blank,
    /// Final device path
    Named(String),
    /// Marker: this minor is offset 0 of a family
    Family(Family),
    /// Continuation: the marker lies this many minors earlier
    BackReference(u32),
}

impl TableEntry {
    pub fn is_marker(&self) -> bool {
        matches!(self, TableEntry::Family(_))
    }
}

/// Errors raised while building or validating a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Minor {0} exceeds the table ceiling")]
    MinorOutOfRange(u32),

    #[error("Numbered name at minor {0} passes the largest device number")]
    NumberOverflow(u32),

    #[error("Major {0} exceeds the table ceiling")]
    MajorOutOfRange(u32),

    #[error("Major {0} is already defined")]
    DuplicateMajor(u32),

    #[error("Marker at minor {0} leaves no room for its family")]
    MarkerTooLate(u32),

    #[error("Marker at minor {minor} is missing its back-reference at offset {offset}")]
    TruncatedFamily { minor: u32, offset: u32 },

    #[error("Back-reference at minor {minor} (distance {distance}) does not reach a marker")]
    DanglingBackReference { minor: u32, distance: u32 },
}

/// Minor slots of a single major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorTable {
    entries: Vec<TableEntry>,
}

impl MajorTable {
    /// Wraps raw entries without validating them.
    ///
    /// The slot count is padded with blanks or truncated to [`MAX_MINOR`].
    pub fn from_entries(mut entries: Vec<TableEntry>) -> Self {
        entries.resize(MAX_MINOR as usize, TableEntry::Blank);
        Self { entries }
    }

    /// Returns the slot for `minor`, or `None` past the ceiling.
    pub fn get(&self, minor: u32) -> Option<&TableEntry> {
        self.entries.get(minor as usize)
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Checks the marker layout of every slot.
    pub fn validate(&self) -> Result<(), TableError> {
        for (index, entry) in self.entries.iter().enumerate() {
            let minor = index as u32;
            match entry {
                TableEntry::Family(_) => {
                    if minor > MAX_MINOR - MIN_PERMITTED_AUTOREPEAT {
                        return Err(TableError::MarkerTooLate(minor));
                    }
                    for offset in 1..=2 {
                        if self.get(minor + offset) != Some(&TableEntry::BackReference(offset)) {
                            return Err(TableError::TruncatedFamily { minor, offset });
                        }
                    }
                }
                TableEntry::BackReference(distance) => {
                    let reaches_marker = minor
                        .checked_sub(*distance)
                        .filter(|_| *distance > 0)
                        .and_then(|marker| self.get(marker))
                        .is_some_and(TableEntry::is_marker);
                    if !reaches_marker {
                        return Err(TableError::DanglingBackReference {
                            minor,
                            distance: *distance,
                        });
                    }
                }
                TableEntry::Blank | TableEntry::Named(_) => {}
            }
        }
        Ok(())
    }
}

/// All majors of one device class
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    majors: BTreeMap<u32, MajorTable>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the table for `major`.
    pub fn insert(&mut self, major: u32, table: MajorTable) -> Result<(), TableError> {
        if major >= MAX_MAJOR {
            return Err(TableError::MajorOutOfRange(major));
        }
        if self.majors.contains_key(&major) {
            return Err(TableError::DuplicateMajor(major));
        }
        self.majors.insert(major, table);
        Ok(())
    }

    pub fn get(&self, major: u32) -> Option<&MajorTable> {
        self.majors.get(&major)
    }

    /// Iterates the defined majors in ascending order.
    pub fn majors(&self) -> impl Iterator<Item = u32> + '_ {
        self.majors.keys().copied()
    }
}

/// The character and block tables together
#[derive(Debug, Clone, Default)]
pub struct DeviceTables {
    char: ClassTable,
    block: ClassTable,
}

impl DeviceTables {
    pub fn new(char: ClassTable, block: ClassTable) -> Self {
        Self { char, block }
    }

    pub fn class(&self, class: DeviceClass) -> &ClassTable {
        match class {
            DeviceClass::Char => &self.char,
            DeviceClass::Block => &self.block,
        }
    }

    /// Returns the table for `major` of `class`, if one is defined.
    pub fn major(&self, class: DeviceClass, major: u32) -> Option<&MajorTable> {
        self.class(class).get(major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(base: &str, first: u32) -> TableEntry {
        TableEntry::Family(Family::Repeat {
            base: base.to_string(),
            first,
        })
    }

    #[test]
    fn test_from_entries_pads_to_ceiling() {
        let table = MajorTable::from_entries(vec![TableEntry::Named("/dev/null".into())]);
        assert_eq!(table.entries().len(), MAX_MINOR as usize);
        assert_eq!(table.get(255), Some(&TableEntry::Blank));
        assert_eq!(table.get(256), None);
    }

    #[test]
    fn test_validate_accepts_family() {
        let table = MajorTable::from_entries(vec![
            repeat("/dev/ttyS", 0),
            TableEntry::BackReference(1),
            TableEntry::BackReference(2),
            TableEntry::BackReference(3),
        ]);
        assert_eq!(table.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_truncated_family() {
        let table = MajorTable::from_entries(vec![
            repeat("/dev/ttyS", 0),
            TableEntry::BackReference(1),
        ]);
        assert_eq!(
            table.validate(),
            Err(TableError::TruncatedFamily { minor: 0, offset: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_dangling_back_reference() {
        let table = MajorTable::from_entries(vec![
            TableEntry::Named("/dev/tty0".into()),
            TableEntry::BackReference(1),
        ]);
        assert_eq!(
            table.validate(),
            Err(TableError::DanglingBackReference { minor: 1, distance: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_back_reference_before_start() {
        let table = MajorTable::from_entries(vec![TableEntry::BackReference(3)]);
        assert!(matches!(
            table.validate(),
            Err(TableError::DanglingBackReference { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_late_marker() {
        let mut entries = vec![TableEntry::Blank; 253];
        entries.push(repeat("/dev/late", 0));
        entries.push(TableEntry::BackReference(1));
        entries.push(TableEntry::BackReference(2));
        let table = MajorTable::from_entries(entries);
        assert_eq!(table.validate(), Err(TableError::MarkerTooLate(253)));
    }

    #[test]
    fn test_class_table_rejects_out_of_range_major() {
        let mut class = ClassTable::new();
        let result = class.insert(512, MajorTable::from_entries(Vec::new()));
        assert_eq!(result, Err(TableError::MajorOutOfRange(512)));
    }

    #[test]
    fn test_class_table_rejects_duplicate_major() {
        let mut class = ClassTable::new();
        class.insert(8, MajorTable::from_entries(Vec::new())).unwrap();
        let result = class.insert(8, MajorTable::from_entries(Vec::new()));
        assert_eq!(result, Err(TableError::DuplicateMajor(8)));
    }

    #[test]
    fn test_device_tables_select_class() {
        let mut block = ClassTable::new();
        block.insert(8, MajorTable::from_entries(Vec::new())).unwrap();
        let tables = DeviceTables::new(ClassTable::new(), block);

        assert!(tables.major(DeviceClass::Block, 8).is_some());
        assert!(tables.major(DeviceClass::Char, 8).is_none());
    }
}
