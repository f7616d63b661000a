//! Timestamp normalization
//!
//! Byteport accepts millisecond precision timestamps, but this client sends
//! microsecond precision where the input carries it, to support a possible
//! future API enhancement. The canonical wire form is a decimal string of
//! Unix epoch seconds with up to six fractional digits and no trailing
//! zeros or trailing decimal point: an epoch of 1.5 seconds normalizes to
//! `"1.5"`, a whole epoch of 2 to `"2"`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::error::{ByteportError, ByteportResult};

/// A timestamp in one of the shapes the client accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    /// Whole Unix epoch seconds
    EpochSeconds(i64),

    /// Fractional Unix epoch seconds
    EpochSecondsFloat(f64),

    /// Calendar date-time in UTC
    Utc(DateTime<Utc>),

    /// Calendar date-time without a timezone; treated as UTC
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Render the canonical wire representation
    ///
    /// Fails with `UnsupportedTimestamp` for values that cannot be placed on
    /// the epoch timeline (non-finite float seconds).
    pub fn normalize(&self) -> ByteportResult<String> {
        match *self {
            Timestamp::EpochSeconds(secs) => Ok(secs.to_string()),
            Timestamp::EpochSecondsFloat(secs) => {
                if !secs.is_finite() {
                    return Err(ByteportError::UnsupportedTimestamp(format!(
                        "non-finite epoch seconds: {secs}"
                    )));
                }
                Ok(strip_fraction(format!("{secs:.6}")))
            }
            Timestamp::Utc(dt) => Ok(format_epoch_micros(dt.timestamp_micros())),
            // Without a timezone the value is interpreted as UTC
            Timestamp::Naive(ndt) => Ok(format_epoch_micros(ndt.and_utc().timestamp_micros())),
        }
    }
}

/// Format whole microseconds since the epoch without an f64 round-trip
fn format_epoch_micros(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let magnitude = micros.unsigned_abs();
    let secs = magnitude / 1_000_000;
    let frac = magnitude % 1_000_000;
    if frac == 0 {
        format!("{sign}{secs}")
    } else {
        strip_fraction(format!("{sign}{secs}.{frac:06}"))
    }
}

/// Strip trailing zeros, then a bare trailing decimal point
fn strip_fraction(rendered: String) -> String {
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Timestamp::EpochSeconds(secs)
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Timestamp::EpochSecondsFloat(secs)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Utc(dt)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Utc(dt.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(ndt: NaiveDateTime) -> Self {
        Timestamp::Naive(ndt)
    }
}
