//! Device identities: class and major/minor number

use crate::{MAX_MAJOR, MAX_MINOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Class of a device special file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Character device (`S_IFCHR`)
    Char,
    /// Block device (`S_IFBLK`)
    Block,
}

impl DeviceClass {
    /// Scan order used by every full pass: characters first, then blocks.
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Char, DeviceClass::Block];

    /// Maps a class letter (`c` or `b`) to a class.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'c' => Some(DeviceClass::Char),
            'b' => Some(DeviceClass::Block),
            _ => None,
        }
    }

    /// Parses a class token by its first character.
    ///
    /// `char`, `c`, `character` and even `cat` all mean [`DeviceClass::Char`].
    pub fn from_token(token: &str) -> Option<Self> {
        token.chars().next().and_then(Self::from_letter)
    }

    /// Returns the single-letter form (`c` or `b`).
    pub fn letter(&self) -> char {
        match self {
            DeviceClass::Char => 'c',
            DeviceClass::Block => 'b',
        }
    }

    /// Name of this class's directory under `/sys/dev`.
    pub fn registry_dir(&self) -> &'static str {
        match self {
            DeviceClass::Char => "char",
            DeviceClass::Block => "block",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_dir())
    }
}

/// Errors from parsing a `<major>:<minor>` string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceNumberParseError {
    #[error("Missing ':' separator in {0:?}")]
    MissingSeparator(String),

    #[error("Invalid major number: {0:?}")]
    InvalidMajor(String),

    #[error("Invalid minor number: {0:?}")]
    InvalidMinor(String),
}

/// A kernel device number
///
/// Any pair can be represented; [`DeviceNumber::in_range`] reports whether
/// the pair falls inside the name table ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl DeviceNumber {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses separate major and minor strings.
    pub fn from_parts(major: &str, minor: &str) -> Result<Self, DeviceNumberParseError> {
        let major = major
            .trim()
            .parse()
            .map_err(|_| DeviceNumberParseError::InvalidMajor(major.to_string()))?;
        let minor = minor
            .trim()
            .parse()
            .map_err(|_| DeviceNumberParseError::InvalidMinor(minor.to_string()))?;
        Ok(Self { major, minor })
    }

    /// Returns true if both numbers are below the table ceilings.
    pub fn in_range(&self) -> bool {
        self.major < MAX_MAJOR && self.minor < MAX_MINOR
    }
}

impl FromStr for DeviceNumber {
    type Err = DeviceNumberParseError;

    /// Parses the `/sys/dev` form `<major>:<minor>`, splitting on the first colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once(':')
            .ok_or_else(|| DeviceNumberParseError::MissingSeparator(s.to_string()))?;
        Self::from_parts(major, minor)
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}
