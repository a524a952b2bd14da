//! Clip window parsing and validation.
//!
//! The UI sends clip bounds as strict `HH:MM:SS` strings (24-hour,
//! zero-padded). They are turned into a [`TimeWindow`] of media-relative
//! offsets before a job is admitted.

use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest offset expressible as `HH:MM:SS` with a 24-hour clock.
pub const MAX_CLOCK_SECS: u64 = 23 * 3600 + 59 * 60 + 59;

/// Timestamp parsing/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS")]
    InvalidFormat(String),

    #[error("Invalid {component} value '{value}'")]
    OutOfRange {
        component: &'static str,
        value: String,
    },

    #[error("Start time must be before end time")]
    StartNotBeforeEnd,

    #[error("End time ({end_secs:.1}s) exceeds media duration ({media_secs:.1}s)")]
    ExceedsMediaDuration { end_secs: f64, media_secs: f64 },
}

/// Parse a strict `HH:MM:SS` string into an offset.
///
/// # Examples
/// ```
/// use ytclip_models::timestamp::parse_clock;
/// assert_eq!(parse_clock("01:30:00").unwrap().as_secs(), 5400);
/// assert!(parse_clock("1:30:00").is_err());
/// ```
pub fn parse_clock(ts: &str) -> Result<Duration, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() != 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    let hours = parse_field(parts[0], "hours", 23, ts)?;
    let minutes = parse_field(parts[1], "minutes", 59, ts)?;
    let seconds = parse_field(parts[2], "seconds", 59, ts)?;

    Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

fn parse_field(
    field: &str,
    component: &'static str,
    max: u64,
    whole: &str,
) -> Result<u64, TimestampError> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidFormat(whole.to_string()));
    }
    let value: u64 = field
        .parse()
        .map_err(|_| TimestampError::InvalidFormat(whole.to_string()))?;
    if value > max {
        return Err(TimestampError::OutOfRange {
            component,
            value: field.to_string(),
        });
    }
    Ok(value)
}

/// Format an offset as `HH:MM:SS`, dropping sub-second precision.
pub fn format_clock(offset: Duration) -> String {
    let total = offset.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Raw clip bounds as received from the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WindowInput {
    pub start: String,
    pub end: String,
}

impl WindowInput {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Validate into a [`TimeWindow`].
    pub fn parse(&self) -> Result<TimeWindow, TimestampError> {
        TimeWindow::parse(&self.start, &self.end)
    }
}

/// Validated `[start, end)` clip range within the source media.
///
/// Invariant: `start < end`. Whether `end` fits the media can only be
/// checked once the media has been downloaded, see [`TimeWindow::fits_within`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: Duration,
    end: Duration,
}

impl TimeWindow {
    /// Build a window from offsets.
    pub fn new(start: Duration, end: Duration) -> Result<Self, TimestampError> {
        if start >= end {
            return Err(TimestampError::StartNotBeforeEnd);
        }
        Ok(Self { start, end })
    }

    /// Build a window from two `HH:MM:SS` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimestampError> {
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    /// Length of the clip.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn start_secs(&self) -> f64 {
        self.start.as_secs_f64()
    }

    pub fn end_secs(&self) -> f64 {
        self.end.as_secs_f64()
    }

    /// Check the window against the actual media duration.
    ///
    /// A window that runs past the end of the media is rejected, never
    /// truncated.
    pub fn fits_within(&self, media_secs: f64) -> Result<(), TimestampError> {
        if self.end_secs() > media_secs {
            return Err(TimestampError::ExceedsMediaDuration {
                end_secs: self.end_secs(),
                media_secs,
            });
        }
        Ok(())
    }

    /// Back to the wire representation.
    pub fn to_input(&self) -> WindowInput {
        WindowInput::new(format_clock(self.start), format_clock(self.end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}
