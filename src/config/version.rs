//! A minimal semver-compatible version type for the config's `version` field.
//!
//! spec.md §3 requires "major.minor.patch parsing and an operator-defined compatibility
//! range"; pulling in the full `semver` crate for three integers and a compatibility
//! check would be overkill, so this module hand-rolls the narrow slice actually needed.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A parsed `major.minor.patch` version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns whether `self` falls within `[min, max]` inclusive, comparing only the
    /// major version (spec.md §4.2: "compatibility of major version").
    pub fn major_compatible(&self, min: Version, max: Version) -> bool {
        self.major >= min.major && self.major <= max.major
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |name: &str| -> Result<u64, String> {
            parts
                .next()
                .ok_or_else(|| format!("version \"{s}\" is missing the {name} component"))?
                .parse::<u64>()
                .map_err(|_| format!("version \"{s}\" has a non-numeric {name} component"))
        };

        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;

        if parts.next().is_some() {
            return Err(format!("version \"{s}\" has more than three components"));
        }

        Ok(Version::new(major, minor, patch))
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}
