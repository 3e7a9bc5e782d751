//! Trailing time windows for history queries.

use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

/// Length of a trailing history window, in hours.
///
/// A window always ends at "now" and is strictly positive; a zero-hour
/// window cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHours(NonZeroU32);

impl WindowHours {
    /// Default window used when the caller does not specify one.
    pub const DEFAULT: Self = match NonZeroU32::new(24) {
        Some(hours) => Self(hours),
        None => unreachable!(),
    };

    /// Create a window, rejecting zero.
    pub const fn new(hours: u32) -> Option<Self> {
        match NonZeroU32::new(hours) {
            Some(hours) => Some(Self(hours)),
            None => None,
        }
    }

    /// The window length in hours.
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl Default for WindowHours {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WindowHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

/// Error returned when parsing a [`WindowHours`] fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidWindow(String);

impl fmt::Display for InvalidWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window must be a positive number of hours, got '{}'", self.0)
    }
}

impl std::error::Error for InvalidWindow {}

impl FromStr for WindowHours {
    type Err = InvalidWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hours = trimmed.strip_suffix('h').unwrap_or(trimmed);
        hours
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidWindow(s.to_string()))
    }
}
