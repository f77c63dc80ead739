//! Dotted version parsing and ordering.
//!
//! Release tags published for the updater look like `v1.2.3` or `1.2.3.4`. This
//! module parses them into a [`Version`] with up to four numeric components
//! (major, minor, build, revision) and orders them component by component.
//!
//! # Format
//!
//! ```text
//! v?MAJOR.MINOR[.BUILD[.REVISION]]
//! ```
//!
//! - A single leading `v` is stripped (`v1.2.3` == `1.2.3`)
//! - At least two and at most four components are accepted
//! - Missing trailing components compare as zero, so `1.2` == `1.2.0` == `1.2.0.0`
//!
//! # Examples
//!
//! ```rust
//! use skin_updater::version::Version;
//!
//! let current = Version::parse("0.3.0").unwrap();
//! let latest = Version::parse("v0.3.1").unwrap();
//! assert!(latest > current);
//!
//! assert_eq!(Version::parse("1.2.0").unwrap(), Version::parse("1.2").unwrap());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Maximum number of numeric components in a version string.
const MAX_COMPONENTS: usize = 4;

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// The input was empty (or only a `v` prefix).
    #[error("version string is empty")]
    Empty,

    /// Fewer than two or more than four components were given.
    #[error("version '{input}' must have between 2 and {MAX_COMPONENTS} components")]
    ComponentCount {
        /// The rejected input
        input: String,
    },

    /// A component was not a non-negative integer.
    #[error("invalid component '{component}' in version '{input}'")]
    InvalidComponent {
        /// The rejected input
        input: String,
        /// The offending component
        component: String,
    },
}

/// A dotted numeric version with up to four components.
///
/// Equality and ordering only look at the numeric values; the number of
/// components that were written is kept for display purposes.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    parts: [u32; MAX_COMPONENTS],
    len: usize,
}

impl Version {
    /// Creates a three component version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            parts: [major, minor, build, 0],
            len: 3,
        }
    }

    /// Parses a version string such as `v1.2.3` or `1.2.3.4`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] when the string is empty, has the wrong
    /// number of components, or contains a non-numeric component.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let components: Vec<&str> = body.split('.').collect();
        if components.len() < 2 || components.len() > MAX_COMPONENTS {
            return Err(VersionParseError::ComponentCount {
                input: input.to_string(),
            });
        }

        let mut parts = [0u32; MAX_COMPONENTS];
        for (slot, component) in parts.iter_mut().zip(&components) {
            // u32::from_str accepts a leading '+', which is not a valid component
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError::InvalidComponent {
                    input: input.to_string(),
                    component: (*component).to_string(),
                });
            }
            *slot = component.parse().map_err(|_| VersionParseError::InvalidComponent {
                input: input.to_string(),
                component: (*component).to_string(),
            })?;
        }

        Ok(Self {
            parts,
            len: components.len(),
        })
    }

    /// The version of the running binary.
    ///
    /// Cargo always embeds a valid three part version, so a parse failure
    /// falls back to `0.0.0` which makes any published release look newer.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(env!("CARGO_PKG_VERSION")).unwrap_or(Self::new(0, 0, 0))
    }

    /// Major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.parts[0]
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.parts[1]
    }

    /// Build component, zero when absent.
    #[must_use]
    pub const fn build(&self) -> u32 {
        self.parts[2]
    }

    /// Revision component, zero when absent.
    #[must_use]
    pub const fn revision(&self) -> u32 {
        self.parts[3]
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<String> = self.parts[..self.len].iter().map(u32::to_string).collect();
        write!(f, "{}", shown.join("."))
    }
}

/// Compares two version strings.
///
/// # Errors
///
/// Fails if either side does not parse.
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionParseError> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}
