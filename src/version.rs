//! Fixed-width version identifiers.
//!
//! A version is a non-negative integer rendered as a zero-padded decimal
//! string of exactly [`VERSION_WIDTH`] digits.  Because every `Version`
//! has the same width, plain string ordering equals numeric ordering, so
//! the storage backend's native sort doubles as version ordering.
//!
//! `Version` values can only be produced by this module (`pad`,
//! `increment`, `FromStr`), which keeps mixed-width comparisons out of
//! the rest of the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// Number of digits in a padded version string.
pub const VERSION_WIDTH: usize = 19;

/// Largest value that fits in [`VERSION_WIDTH`] digits.
const MAX_VALUE: u64 = 9_999_999_999_999_999_999;

/// A zero-padded, fixed-width version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// The "no prior version" value, `0000000000000000000`.
    pub fn zero() -> Self {
        Version("0".repeat(VERSION_WIDTH))
    }

    /// Render `n` as a padded version string.
    pub fn pad(n: u64) -> Result<Self> {
        if n > MAX_VALUE {
            return Err(CredVaultError::Overflow(n.to_string()));
        }
        Ok(Version(format!("{n:0width$}", width = VERSION_WIDTH)))
    }

    /// Numeric value of this version.
    pub fn value(&self) -> u64 {
        // Construction guarantees VERSION_WIDTH ASCII digits <= MAX_VALUE.
        self.0.bytes().fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'))
    }

    /// The next version, or `Overflow` past the largest padded value.
    pub fn increment(&self) -> Result<Self> {
        let next = self
            .value()
            .checked_add(1)
            .ok_or_else(|| CredVaultError::Overflow(self.0.clone()))?;
        Version::pad(next)
    }

    /// Returns `true` for the zero value.
    pub fn is_zero(&self) -> bool {
        self.value() == 0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::zero()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = CredVaultError;

    /// Parse a purely numeric string of at most [`VERSION_WIDTH`] digits.
    ///
    /// Shorter inputs such as `"42"` are normalised to the padded form.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CredVaultError::NotAnInteger(s.to_string()));
        }
        let digits = s.trim_start_matches('0');
        if digits.len() > VERSION_WIDTH {
            return Err(CredVaultError::Overflow(s.to_string()));
        }
        let n: u64 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| CredVaultError::Overflow(s.to_string()))?
        };
        Version::pad(n)
    }
}

impl TryFrom<String> for Version {
    type Error = CredVaultError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> String {
        v.0
    }
}

/// Parse a raw version string and return the version after it.
///
/// Fails with `NotAnInteger` when `raw` is not purely numeric.
pub fn increment(raw: &str) -> Result<Version> {
    raw.parse::<Version>()?.increment()
}

/// Return the highest of `versions`, or [`Version::zero`] when empty.
pub fn highest_of<'a, I>(versions: I) -> Version
where
    I: IntoIterator<Item = &'a Version>,
{
    versions.into_iter().max().cloned().unwrap_or_default()
}
