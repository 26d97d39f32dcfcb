//! Built-in name tables for common Linux majors
//!
//! Derived from the kernel's `Documentation/admin-guide/devices.txt`. Rare and
//! legacy majors are left out; unknown majors simply do not resolve.

use crate::{ClassTable, DeviceTables, MajorTableBuilder, TableError};

/// Builds the built-in tables.
pub fn build_builtin() -> Result<DeviceTables, TableError> {
    Ok(DeviceTables::new(char_table()?, block_table()?))
}

/// Returns the built-in tables.
pub fn builtin_tables() -> DeviceTables {
    build_builtin().expect("built-in device table is static data")
}

fn char_table() -> Result<ClassTable, TableError> {
    let mut table = ClassTable::new();

    table.insert(
        1,
        MajorTableBuilder::new()
            .named(1, "/dev/mem")
            .named(2, "/dev/kmem")
            .named(3, "/dev/null")
            .named(4, "/dev/port")
            .named(5, "/dev/zero")
            .named(7, "/dev/full")
            .named(8, "/dev/random")
            .named(9, "/dev/urandom")
            .named(10, "/dev/aio")
            .named(11, "/dev/kmsg")
            .build()?,
    )?;

    table.insert(
        4,
        MajorTableBuilder::new()
            .named(0, "/dev/tty0")
            .repeat(1..=63, "/dev/tty", 1)
            .repeat(64..=255, "/dev/ttyS", 0)
            .build()?,
    )?;

    table.insert(
        5,
        MajorTableBuilder::new()
            .named(0, "/dev/tty")
            .named(1, "/dev/console")
            .named(2, "/dev/ptmx")
            .named(3, "/dev/ttyprintk")
            .build()?,
    )?;

    table.insert(6, MajorTableBuilder::new().repeat(0..=255, "/dev/lp", 0).build()?)?;

    table.insert(
        7,
        MajorTableBuilder::new()
            .named(0, "/dev/vcs")
            .repeat(1..=63, "/dev/vcs", 1)
            .named(128, "/dev/vcsa")
            .repeat(129..=191, "/dev/vcsa", 1)
            .build()?,
    )?;

    table.insert(
        10,
        MajorTableBuilder::new()
            .named(1, "/dev/psaux")
            .named(130, "/dev/watchdog")
            .named(144, "/dev/nvram")
            .named(183, "/dev/hwrng")
            .named(200, "/dev/net/tun")
            .named(223, "/dev/uinput")
            .named(227, "/dev/mcelog")
            .named(228, "/dev/hpet")
            .named(229, "/dev/fuse")
            .named(231, "/dev/snapshot")
            .named(232, "/dev/kvm")
            .named(235, "/dev/autofs")
            .named(236, "/dev/mapper/control")
            .named(237, "/dev/loop-control")
            .named(238, "/dev/vhost-net")
            .named(239, "/dev/uhid")
            .build()?,
    )?;

    table.insert(
        13,
        MajorTableBuilder::new()
            .repeat(0..=31, "/dev/input/js", 0)
            .repeat(32..=62, "/dev/input/mouse", 0)
            .named(63, "/dev/input/mice")
            .repeat(64..=95, "/dev/input/event", 0)
            .build()?,
    )?;

    table.insert(
        14,
        MajorTableBuilder::new()
            .named(0, "/dev/mixer")
            .named(1, "/dev/sequencer")
            .named(2, "/dev/midi00")
            .named(3, "/dev/dsp")
            .named(4, "/dev/audio")
            .named(6, "/dev/sndstat")
            .named(7, "/dev/audioctl")
            .named(8, "/dev/sequencer2")
            .named(16, "/dev/mixer1")
            .named(17, "/dev/patmgr0")
            .named(18, "/dev/midi01")
            .named(19, "/dev/dsp1")
            .named(20, "/dev/audio1")
            .named(33, "/dev/patmgr1")
            .named(34, "/dev/midi02")
            .named(50, "/dev/midi03")
            .build()?,
    )?;

    table.insert(29, MajorTableBuilder::new().repeat(0..=31, "/dev/fb", 0).build()?)?;
    table.insert(89, MajorTableBuilder::new().repeat(0..=255, "/dev/i2c-", 0).build()?)?;

    // MTD devices interleave read/write and read-only nodes.
    let mtd = (0..16).fold(MajorTableBuilder::new(), |builder, unit| {
        builder
            .named(unit * 2, format!("/dev/mtd{}", unit))
            .named(unit * 2 + 1, format!("/dev/mtdr{}", unit))
    });
    table.insert(90, mtd.build()?)?;

    table.insert(108, MajorTableBuilder::new().named(0, "/dev/ppp").build()?)?;

    // Static ALSA minors: 32 per card. Only the first card's PCM, MIDI and
    // hwdep nodes are listed.
    let alsa = (0..8).fold(MajorTableBuilder::new(), |builder, card| {
        builder.named(card * 32, format!("/dev/snd/controlC{}", card))
    });
    let alsa = (0..8).fold(alsa, |builder, device| {
        builder
            .named(16 + device, format!("/dev/snd/pcmC0D{}p", device))
            .named(24 + device, format!("/dev/snd/pcmC0D{}c", device))
    });
    table.insert(
        116,
        alsa.named(1, "/dev/snd/seq")
            .repeat(4..=7, "/dev/snd/hwC0D", 0)
            .repeat(8..=15, "/dev/snd/midiC0D", 0)
            .named(33, "/dev/snd/timer")
            .build()?,
    )?;
    table.insert(136, MajorTableBuilder::new().repeat(0..=255, "/dev/pts/", 0).build()?)?;

    table.insert(
        180,
        MajorTableBuilder::new()
            .repeat(0..=15, "/dev/usb/lp", 0)
            .repeat(96..=111, "/dev/usb/hiddev", 0)
            .build()?,
    )?;

    table.insert(188, MajorTableBuilder::new().repeat(0..=255, "/dev/ttyUSB", 0).build()?)?;
    table.insert(189, MajorTableBuilder::new().repeat(0..=255, "/dev/cuusb", 0).build()?)?;

    // Low-density serial ports. 64-77 follow the kernel's amba-pl011
    // assignment rather than the ioc4 range listed for them.
    table.insert(
        204,
        MajorTableBuilder::new()
            .repeat(0..=3, "/dev/ttyLU", 0)
            .named(4, "/dev/ttyFB0")
            .repeat(5..=7, "/dev/ttySA", 0)
            .repeat(8..=11, "/dev/ttySC", 0)
            .repeat(12..=15, "/dev/ttyFW", 0)
            .repeat(16..=31, "/dev/ttyAM", 0)
            .repeat(32..=39, "/dev/ttyDB", 0)
            .named(40, "/dev/ttySG0")
            .repeat(41..=43, "/dev/ttySMX", 0)
            .repeat(44..=45, "/dev/ttyMM", 0)
            .repeat(46..=51, "/dev/ttyCPM", 0)
            .repeat(52..=63, "/dev/ttyIOC", 0)
            .repeat(64..=77, "/dev/ttyAMA", 0)
            .repeat(78..=83, "/dev/ttyIOC", 26)
            .repeat(84..=85, "/dev/ttyVR", 0)
            .repeat(86..=115, "/dev/ttyIOC", 84)
            .repeat(116..=147, "/dev/ttySIOC", 0)
            .repeat(148..=153, "/dev/ttyPSC", 0)
            .repeat(154..=169, "/dev/ttyAT", 0)
            .repeat(170..=185, "/dev/ttyNX", 0)
            .named(186, "/dev/ttyJ0")
            .repeat(187..=190, "/dev/ttyUL", 0)
            .named(191, "/dev/xvc0")
            .repeat(192..=195, "/dev/ttyPZ", 0)
            .repeat(196..=203, "/dev/ttyTX", 0)
            .repeat(209..=212, "/dev/ttyMAX", 0)
            .build()?,
    )?;

    Ok(table)
}

/// Lettered storage majors: `(major, base, disks, minors per disk, first id)`.
const LETTERED_STORAGE: &[(u32, &str, u32, u32, &str)] = &[
    (3, "/dev/hd", 2, 64, "a"),
    (8, "/dev/sd", 16, 16, "a"),
    (22, "/dev/hd", 2, 64, "c"),
    (33, "/dev/hd", 2, 64, "e"),
    (34, "/dev/hd", 2, 64, "g"),
    (44, "/dev/ftl", 16, 16, "a"),
    (45, "/dev/pd", 4, 16, "a"),
    (56, "/dev/hd", 2, 64, "i"),
    (57, "/dev/hd", 2, 64, "k"),
    (65, "/dev/sd", 16, 16, "q"),
    (66, "/dev/sd", 16, 16, "ag"),
    (67, "/dev/sd", 16, 16, "aw"),
    (68, "/dev/sd", 16, 16, "bm"),
    (69, "/dev/sd", 16, 16, "cc"),
    (70, "/dev/sd", 16, 16, "cs"),
    (71, "/dev/sd", 16, 16, "di"),
    (80, "/dev/i2o/hd", 16, 16, "a"),
    (81, "/dev/i2o/hd", 16, 16, "q"),
    (82, "/dev/i2o/hd", 16, 16, "ag"),
    (83, "/dev/i2o/hd", 16, 16, "aw"),
    (84, "/dev/i2o/hd", 16, 16, "bm"),
    (85, "/dev/i2o/hd", 16, 16, "cc"),
    (86, "/dev/i2o/hd", 16, 16, "cs"),
    (87, "/dev/i2o/hd", 16, 16, "di"),
    (88, "/dev/hd", 2, 64, "m"),
    (89, "/dev/hd", 2, 64, "o"),
    (90, "/dev/hd", 2, 64, "q"),
    (91, "/dev/hd", 2, 64, "s"),
    (93, "/dev/nftl", 16, 16, "a"),
    (96, "/dev/inftl", 16, 16, "a"),
    (98, "/dev/ubd", 16, 16, "a"),
    (102, "/dev/cbd/", 16, 16, "a"),
    (128, "/dev/sd", 16, 16, "dy"),
    (129, "/dev/sd", 16, 16, "eo"),
    (130, "/dev/sd", 16, 16, "fe"),
    (131, "/dev/sd", 16, 16, "fu"),
    (132, "/dev/sd", 16, 16, "gk"),
    (133, "/dev/sd", 16, 16, "ha"),
    (134, "/dev/sd", 16, 16, "hq"),
    (135, "/dev/sd", 16, 16, "ig"),
    (180, "/dev/ub", 32, 8, "a"),
    (202, "/dev/xvd", 16, 16, "a"),
    (256, "/dev/rfd", 16, 16, "a"),
    (257, "/dev/ssfdc", 32, 8, "a"),
];

/// Numbered storage majors with a `p` partition infix.
const NUMBERED_STORAGE: &[(u32, &str, u32, u32, u32)] = &[
    (153, "/dev/emd/", 16, 16, 0),
    (179, "/dev/mmcblk", 32, 8, 0),
];

fn block_table() -> Result<ClassTable, TableError> {
    let mut table = ClassTable::new();

    table.insert(1, MajorTableBuilder::new().repeat(0..=255, "/dev/ram", 0).build()?)?;
    table.insert(7, MajorTableBuilder::new().repeat(0..=255, "/dev/loop", 0).build()?)?;
    table.insert(9, MajorTableBuilder::new().repeat(0..=255, "/dev/md", 0).build()?)?;
    table.insert(11, MajorTableBuilder::new().repeat(0..=255, "/dev/sr", 0).build()?)?;

    for &(major, base, disks, interval, first_id) in LETTERED_STORAGE {
        let builder = MajorTableBuilder::new().storage(0, disks, interval, base, first_id);
        table.insert(major, builder.build()?)?;
    }

    for &(major, base, disks, interval, first) in NUMBERED_STORAGE {
        let builder = MajorTableBuilder::new().storage_partitions(0, disks, interval, base, first);
        table.insert(major, builder.build()?)?;
    }

    Ok(table)
}
