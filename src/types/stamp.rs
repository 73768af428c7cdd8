// ABOUTME: Fixed-width build timestamps used in image names and tags.
// ABOUTME: Lexical order of the rendered form equals chronological order.

use chrono::{DateTime, Local, TimeZone};
use std::fmt;

/// Format string for rendered stamps, e.g. `260830_1435`.
const STAMP_FORMAT: &str = "%y%m%d_%H%M";

/// A minute-resolution build timestamp.
///
/// Rendered as `yymmdd_HHMM` (fixed width, zero padded), so sorting the
/// rendered strings sorts chronologically. Retention pruning relies on
/// this property when ordering images by their `timestamp` tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildStamp(String);

impl BuildStamp {
    /// Stamp for the current local time.
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(dt: DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(dt.format(STAMP_FORMAT).to_string())
    }

    /// Wrap an already-rendered stamp, e.g. one read back from a tag.
    /// No validation: tags written by other tooling are accepted as-is.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of build stamps, injectable so tests can pin time.
#[derive(Debug, Clone, Default)]
pub enum StampSource {
    #[default]
    Wallclock,
    Fixed(String),
}

impl StampSource {
    pub fn fixed(stamp: impl Into<String>) -> Self {
        Self::Fixed(stamp.into())
    }

    pub fn stamp(&self) -> BuildStamp {
        match self {
            Self::Wallclock => BuildStamp::now(),
            Self::Fixed(raw) => BuildStamp::from_raw(raw.clone()),
        }
    }
}
