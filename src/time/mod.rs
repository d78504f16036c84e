//! # Time-Range Algebra
//!
//! Exact rational timestamps and ranges. Every composition edit stays in
//! rational form; conversion to floating seconds happens only when a command
//! line is rendered for the encoder.

mod range;
mod rational;

pub use range::{scale_duration, TimeRange};
pub use rational::{Rational, DEFAULT_TIMESCALE};

use crate::error::{EditorError, Result};

/// Format a timestamp as zero-padded `HH:MM:SS`.
///
/// Fractional seconds are truncated and negative times clamp to `00:00:00`.
pub fn format_hms(time: Rational) -> String {
    let total = time.floor_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse `HH:MM:SS`, `MM:SS` or `SS` (each part may be decimal) into a
/// timestamp at the default 1/600 s timescale.
pub fn parse_timestamp(text: &str) -> Result<Rational> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(EditorError::invalid_range(format!("unrecognised timestamp '{}'", text)));
    }

    let mut seconds = Rational::ZERO;
    for part in &parts {
        let value: Rational = part.parse().map_err(|_| {
            EditorError::invalid_range(format!("unrecognised timestamp '{}'", text))
        })?;
        if value.is_negative() {
            return Err(EditorError::invalid_range(format!("negative timestamp '{}'", text)));
        }
        seconds = seconds * Rational::from_integer(60) + value;
    }

    Ok(seconds.round_to_timescale(DEFAULT_TIMESCALE))
}
