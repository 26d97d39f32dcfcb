//! # Command Line Commands
//!
//! ## Command Set
//!
//! - `<class> <major>:<minor>` / `<class> <major> <minor>` - Print device path
//! - `mk<class> <major>:<minor>` / `mk<class> <major> <minor>` - Create node
//! - `scan` - Recreate nodes for every live device
//! - `update` - Create nodes missing for live devices
//! - `watch [interval]` - `scan`, then `update` every interval seconds
//!
//! A class token is read by its first character (`c` or `b`), or by its third
//! for the `mk` forms. Any other token parses, but resolves nothing.

use core_types::{DeviceClass, DeviceNumber, DeviceNumberParseError};
use thiserror::Error;

/// Interval used by `watch` without an argument.
pub const DEFAULT_WATCH_INTERVAL_SECS: u32 = 10;

/// Command parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Missing command")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid device number: {0}")]
    InvalidDeviceNumber(#[from] DeviceNumberParseError),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Too many arguments")]
    TooManyArguments,
}

/// Commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the path of a device
    Lookup {
        class: Option<DeviceClass>,
        number: DeviceNumber,
    },

    /// Create the special file of a device
    MakeNode {
        class: Option<DeviceClass>,
        number: DeviceNumber,
    },

    /// Overwrite nodes for all live devices
    Scan,

    /// Create nodes only where none exist
    Update,

    /// Scan, then update periodically
    Watch { interval_secs: u32 },
}

/// Command parser
pub struct CommandParser;

impl CommandParser {
    /// Parses the arguments following the program name
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Command, CommandError> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();

        match args.as_slice() {
            [] => Err(CommandError::MissingCommand),
            ["scan"] => Ok(Command::Scan),
            ["update"] => Ok(Command::Update),
            ["watch"] => Ok(Command::Watch {
                interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
            }),
            [other] => Err(CommandError::UnknownCommand(other.to_string())),
            ["watch", interval] => Self::parse_watch(interval),
            [class, number] => Ok(Self::device_command(class, number.parse()?)),
            [class, major, minor] => Ok(Self::device_command(
                class,
                DeviceNumber::from_parts(major, minor)?,
            )),
            _ => Err(CommandError::TooManyArguments),
        }
    }

    /// Parses the "watch" interval
    ///
    /// Negative values are accepted and later clamped like zero.
    fn parse_watch(interval: &str) -> Result<Command, CommandError> {
        let value: i64 = interval
            .trim()
            .parse()
            .map_err(|_| CommandError::InvalidInterval(interval.to_string()))?;
        let interval_secs = u32::try_from(value.max(0)).unwrap_or(u32::MAX);
        Ok(Command::Watch { interval_secs })
    }

    /// Builds a lookup or node command from its class token
    fn device_command(token: &str, number: DeviceNumber) -> Command {
        match token.strip_prefix("mk") {
            Some(rest) if !rest.is_empty() => Command::MakeNode {
                class: DeviceClass::from_token(rest),
                number,
            },
            _ => Command::Lookup {
                class: DeviceClass::from_token(token),
                number,
            },
        }
    }
}
