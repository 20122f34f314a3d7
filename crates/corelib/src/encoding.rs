//! Encoding version and runtime version constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Runtime version as an integer: `AABBCC` for `AA.BB.CC`.
pub const INT_VERSION: u32 = 30702;

/// Runtime version as a string.
pub const STRING_VERSION: &str = "3.7.2";

/// Version of the wire encoding used by an endpoint or a message.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EncodingVersion {
    pub major: u8,
    pub minor: u8,
}

pub const ENCODING_1_0: EncodingVersion = EncodingVersion { major: 1, minor: 0 };
pub const ENCODING_1_1: EncodingVersion = EncodingVersion { major: 1, minor: 1 };

/// The encoding this runtime writes by default.
pub fn current_encoding() -> EncodingVersion {
    ENCODING_1_1
}

impl EncodingVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for EncodingVersion {
    fn default() -> Self {
        current_encoding()
    }
}

impl fmt::Display for EncodingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for EncodingVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("malformed encoding version `{}`", s))?;
        let major = major
            .parse::<u8>()
            .map_err(|_| format!("invalid major version in `{}`", s))?;
        let minor = minor
            .parse::<u8>()
            .map_err(|_| format!("invalid minor version in `{}`", s))?;
        Ok(Self { major, minor })
    }
}
