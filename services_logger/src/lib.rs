//! # Logger Service
//!
//! This crate implements the process logger behind the `log` facade.
//!
//! ## Format
//!
//! Every record is one line on stderr, prefixed with the first letter of its
//! level: `E: Failed to create special file: /dev/sda1`. Standard output stays
//! reserved for lookup results.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt;
use std::io::{self, Write};

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "DEVMM2NAME_LOG";

/// Level used when none is configured.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

static LOGGER: StderrLogger = StderrLogger;

/// Logger writing prefixed lines to stderr
pub struct StderrLogger;

/// Returns the one-letter prefix for a level
pub fn level_tag(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}

/// Formats a record the way it appears on stderr
pub fn format_line(level: Level, args: &fmt::Arguments<'_>) -> String {
    format!("{}: {}", level_tag(level), args)
}

/// Parses a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`)
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(record.level(), record.args());
            let _ = writeln!(io::stderr().lock(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Installs the stderr logger.
///
/// Fails if another logger is already installed.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}
