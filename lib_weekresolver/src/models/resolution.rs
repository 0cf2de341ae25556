//! # Resolution Result
//!
//! Wire shape of a successful lookup. All values are taken from the service
//! as-is; the week code and the anchor date are never recomputed locally.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// The date the service used to derive year and week.
///
/// This may lie after the requested date, since the service shifts forward
/// for release day, weekdays and closing days. Historic service versions sent
/// it as epoch milliseconds, newer ones as ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnchorDate {
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Date-time with an offset, e.g. `2019-10-21T00:00:00+02:00`.
    DateTime(DateTime<FixedOffset>),
    /// Date-time without an offset, e.g. `2019-10-21T00:00:00`.
    LocalDateTime(NaiveDateTime),
    /// Calendar date, e.g. `2019-10-21`.
    Date(NaiveDate),
}

impl fmt::Display for AnchorDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorDate::EpochMillis(millis) => write!(f, "{}", millis),
            AnchorDate::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            AnchorDate::LocalDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            AnchorDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Result data from resolving a week code for a catalogue code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    catalogue_code: String,
    year: i32,
    week_number: u32,
    week_code: String,
    date: AnchorDate,
}

impl ResolutionResult {
    /// Catalogue code as normalized by the service (upper case).
    pub fn catalogue_code(&self) -> &str {
        &self.catalogue_code
    }

    /// Year the week belongs to.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Week of the year as computed by the service.
    pub fn week_number(&self) -> u32 {
        self.week_number
    }

    /// Authoritative week code, e.g. `DPF201943`.
    pub fn week_code(&self) -> &str {
        &self.week_code
    }

    /// Anchor date used by the service.
    pub fn date(&self) -> &AnchorDate {
        &self.date
    }

    /// Parses a 200 response body.
    ///
    /// An empty body, a JSON `null`, or a payload missing any required field
    /// is reported as `EmptyResponse`.
    pub fn from_body(body: &[u8]) -> Result<Self, ConnectorError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ConnectorError::EmptyResponse("empty body".into()));
        }
        let parsed: Option<Self> = serde_json::from_slice(body)
            .map_err(|e| ConnectorError::EmptyResponse(e.to_string()))?;
        parsed.ok_or_else(|| ConnectorError::EmptyResponse("null-valued entity".into()))
    }
}
