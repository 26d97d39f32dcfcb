//! Builder for per-major tables
//!
//! Short runs are written out as plain names; longer runs are compressed into
//! a family marker plus back-references. The thresholds match the table
//! generator: a numbered run is compressed when it spans more than four
//! minors, a storage disk when it has more than four minors per disk.

use crate::{Family, MajorTable, TableEntry, TableError};
use core_types::MAX_MINOR;
use std::ops::RangeInclusive;

/// Longest run still written out slot by slot.
const FIXED_RUN_LIMIT: u32 = 4;

/// Returns the disk id that follows `id`: `a`, `b`, ..., `z`, `aa`, `ab`, ...
pub fn next_disk_id(id: &str) -> String {
    let mut chars: Vec<char> = id.chars().collect();
    match chars.pop() {
        None => "a".to_string(),
        Some('z') => {
            let prefix: String = chars.into_iter().collect();
            if prefix.is_empty() {
                "aa".to_string()
            } else {
                next_disk_id(&prefix) + "a"
            }
        }
        Some(last) => {
            let mut next: String = chars.into_iter().collect();
            next.push(char::from_u32(last as u32 + 1).unwrap_or(last));
            next
        }
    }
}

/// Builds a [`MajorTable`] slot by slot
///
/// The first placement error is kept and reported by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct MajorTableBuilder {
    entries: Vec<TableEntry>,
    error: Option<TableError>,
}

impl Default for MajorTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MajorTableBuilder {
    /// Creates a builder with every minor blank.
    pub fn new() -> Self {
        Self {
            entries: vec![TableEntry::Blank; MAX_MINOR as usize],
            error: None,
        }
    }

    fn fail(&mut self, error: TableError) {
        self.error.get_or_insert(error);
    }

    fn set(&mut self, minor: u32, entry: TableEntry) -> bool {
        match self.entries.get_mut(minor as usize) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => {
                self.fail(TableError::MinorOutOfRange(minor));
                false
            }
        }
    }

    /// Minor `index` slots of `interval` after `start`.
    fn minor_at(&mut self, start: u32, index: u32, interval: u32) -> Option<u32> {
        let minor = index
            .checked_mul(interval)
            .and_then(|span| start.checked_add(span));
        if minor.is_none() {
            self.fail(TableError::MinorOutOfRange(u32::MAX));
        }
        minor
    }

    fn family_run(&mut self, minor: u32, family: Family, len: u32) {
        if !self.set(minor, TableEntry::Family(family)) {
            return;
        }
        for offset in 1..len {
            let Some(slot) = minor.checked_add(offset) else {
                self.fail(TableError::MinorOutOfRange(u32::MAX));
                return;
            };
            if !self.set(slot, TableEntry::BackReference(offset)) {
                return;
            }
        }
    }

    /// Places a raw entry. Used for hand-written slots.
    pub fn entry(mut self, minor: u32, entry: TableEntry) -> Self {
        self.set(minor, entry);
        self
    }

    /// Names a single minor.
    pub fn named(self, minor: u32, path: impl Into<String>) -> Self {
        self.entry(minor, TableEntry::Named(path.into()))
    }

    /// Numbers every minor in `minors` as `base + n`, starting at `first`.
    pub fn repeat(mut self, minors: RangeInclusive<u32>, base: &str, first: u32) -> Self {
        let (start, end) = (*minors.start(), *minors.end());
        if end < start {
            return self;
        }

        if end - start <= FIXED_RUN_LIMIT {
            for (index, minor) in (start..=end).zip(0..) {
                match first.checked_add(index) {
                    Some(number) => {
                        self.set(minor, TableEntry::Named(format!("{}{}", base, number)));
                    }
                    None => self.fail(TableError::NumberOverflow(minor)),
                }
            }
        } else if first.checked_add(end - start).is_none() {
            self.fail(TableError::NumberOverflow(start));
        } else {
            let family = Family::Repeat {
                base: base.to_string(),
                first,
            };
            self.family_run(start, family, end - start + 1);
        }
        self
    }

    /// Lays out `disks` lettered disks of `interval` minors each.
    ///
    /// Offset 0 of each disk is the whole disk (`/dev/sda`), the rest are its
    /// partitions (`/dev/sda1`, ...).
    pub fn storage(
        mut self,
        first_minor: u32,
        disks: u32,
        interval: u32,
        base: &str,
        first_id: &str,
    ) -> Self {
        let mut id = first_id.to_string();
        for disk in 0..disks {
            if self.error.is_some() {
                break;
            }
            let Some(minor) = self.minor_at(first_minor, disk, interval) else {
                break;
            };
            if interval <= FIXED_RUN_LIMIT {
                self.set(minor, TableEntry::Named(format!("{}{}", base, id)));
                for part in 1..interval {
                    self.set(
                        minor.saturating_add(part),
                        TableEntry::Named(format!("{}{}{}", base, id, part)),
                    );
                }
            } else {
                let family = Family::Storage {
                    base: base.to_string(),
                    first: id.clone(),
                };
                self.family_run(minor, family, interval);
            }
            id = next_disk_id(&id);
        }
        self
    }

    /// Lays out `disks` numbered disks of `interval` minors each, with a `p`
    /// between disk number and partition number (`/dev/mmcblk0p1`).
    pub fn storage_partitions(
        mut self,
        first_minor: u32,
        disks: u32,
        interval: u32,
        base: &str,
        first: u32,
    ) -> Self {
        for disk in 0..disks {
            if self.error.is_some() {
                break;
            }
            let Some(minor) = self.minor_at(first_minor, disk, interval) else {
                break;
            };
            let Some(number) = first.checked_add(disk) else {
                self.fail(TableError::NumberOverflow(minor));
                break;
            };
            if interval <= FIXED_RUN_LIMIT {
                self.set(minor, TableEntry::Named(format!("{}{}", base, number)));
                for part in 1..interval {
                    self.set(
                        minor.saturating_add(part),
                        TableEntry::Named(format!("{}{}p{}", base, number, part)),
                    );
                }
            } else {
                let family = Family::StoragePartition {
                    base: base.to_string(),
                    first: number,
                };
                self.family_run(minor, family, interval);
            }
        }
        self
    }

    /// Finishes the table, rejecting out-of-range minors and broken families.
    pub fn build(self) -> Result<MajorTable, TableError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let table = MajorTable::from_entries(self.entries);
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_disk_id() {
        assert_eq!(next_disk_id("a"), "b");
        assert_eq!(next_disk_id("y"), "z");
        assert_eq!(next_disk_id("z"), "aa");
        assert_eq!(next_disk_id("az"), "ba");
        assert_eq!(next_disk_id("zz"), "aaa");
        assert_eq!(next_disk_id(""), "a");
    }

    #[test]
    fn test_short_repeat_is_written_out() {
        let table = MajorTableBuilder::new()
            .repeat(0..=3, "/dev/ttyUSB", 0)
            .build()
            .unwrap();

        assert_eq!(table.get(0), Some(&TableEntry::Named("/dev/ttyUSB0".into())));
        assert_eq!(table.get(3), Some(&TableEntry::Named("/dev/ttyUSB3".into())));
        assert_eq!(table.get(4), Some(&TableEntry::Blank));
    }

    #[test]
    fn test_long_repeat_is_compressed() {
        let table = MajorTableBuilder::new()
            .repeat(64..=255, "/dev/ttyS", 0)
            .build()
            .unwrap();

        assert!(table.get(64).unwrap().is_marker());
        assert_eq!(table.get(65), Some(&TableEntry::BackReference(1)));
        assert_eq!(table.get(66), Some(&TableEntry::BackReference(2)));
        assert_eq!(table.get(255), Some(&TableEntry::BackReference(191)));
    }

    #[test]
    fn test_storage_advances_disk_ids() {
        let table = MajorTableBuilder::new()
            .storage(0, 16, 16, "/dev/sd", "a")
            .build()
            .unwrap();

        let expected = Family::Storage {
            base: "/dev/sd".into(),
            first: "b".into(),
        };
        assert_eq!(table.get(16), Some(&TableEntry::Family(expected)));
        assert_eq!(table.get(31), Some(&TableEntry::BackReference(15)));
    }

    #[test]
    fn test_narrow_storage_is_written_out() {
        let table = MajorTableBuilder::new()
            .storage(0, 2, 4, "/dev/pd", "a")
            .build()
            .unwrap();

        assert_eq!(table.get(0), Some(&TableEntry::Named("/dev/pda".into())));
        assert_eq!(table.get(3), Some(&TableEntry::Named("/dev/pda3".into())));
        assert_eq!(table.get(4), Some(&TableEntry::Named("/dev/pdb".into())));
    }

    #[test]
    fn test_narrow_storage_partitions_use_p_infix() {
        let table = MajorTableBuilder::new()
            .storage_partitions(0, 1, 3, "/dev/mmcblk", 2)
            .build()
            .unwrap();

        assert_eq!(table.get(0), Some(&TableEntry::Named("/dev/mmcblk2".into())));
        assert_eq!(table.get(2), Some(&TableEntry::Named("/dev/mmcblk2p2".into())));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let result = MajorTableBuilder::new().repeat(250..=260, "/dev/x", 0).build();
        assert_eq!(result, Err(TableError::MinorOutOfRange(256)));
    }

    #[test]
    fn test_raw_dangling_entry_is_rejected() {
        let result = MajorTableBuilder::new()
            .entry(5, TableEntry::BackReference(2))
            .build();
        assert!(matches!(
            result,
            Err(TableError::DanglingBackReference { minor: 5, distance: 2 })
        ));
    }

    #[test]
    fn test_repeat_number_overflow_is_rejected() {
        let short = MajorTableBuilder::new().repeat(0..=2, "/dev/x", u32::MAX - 1).build();
        assert_eq!(short, Err(TableError::NumberOverflow(2)));

        let long = MajorTableBuilder::new().repeat(10..=20, "/dev/x", u32::MAX - 5).build();
        assert_eq!(long, Err(TableError::NumberOverflow(10)));

        let table = MajorTableBuilder::new()
            .repeat(0..=10, "/dev/x", u32::MAX - 10)
            .build()
            .unwrap();
        assert!(table.get(0).unwrap().is_marker());
    }

    #[test]
    fn test_storage_partition_number_overflow_is_rejected() {
        let result = MajorTableBuilder::new()
            .storage_partitions(0, 3, 8, "/dev/mmcblk", u32::MAX)
            .build();
        assert_eq!(result, Err(TableError::NumberOverflow(8)));
    }

    #[test]
    fn test_storage_minor_overflow_is_rejected() {
        let result = MajorTableBuilder::new()
            .storage(0, 3, u32::MAX / 2, "/dev/sd", "a")
            .build();
        assert!(matches!(result, Err(TableError::MinorOutOfRange(_))));

        let result = MajorTableBuilder::new()
            .storage_partitions(u32::MAX, 1, 2, "/dev/mmcblk", 0)
            .build();
        assert!(matches!(result, Err(TableError::MinorOutOfRange(_))));
    }
}
