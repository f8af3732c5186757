//! Parking spot model and decoding of backend spot records.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::Coordinate;

/// Availability status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpotStatus {
    Available,
    Restricted,
    Occupied,
    Unknown,
    /// Any other string the backend sent, kept verbatim.
    Other(String),
}

impl SpotStatus {
    /// Case-insensitive parse; unrecognised values are preserved as `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "available" => SpotStatus::Available,
            "restricted" => SpotStatus::Restricted,
            "occupied" => SpotStatus::Occupied,
            "unknown" | "" => SpotStatus::Unknown,
            _ => SpotStatus::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Restricted => "restricted",
            SpotStatus::Occupied => "occupied",
            SpotStatus::Unknown => "unknown",
            SpotStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weekly no-parking window: on `day`, from `start` through `end` inclusive.
/// Always satisfies `start <= end`; windows crossing midnight are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restriction {
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestrictionError {
    #[error("restriction window ends ({end}) before it starts ({start})")]
    InvertedWindow { start: NaiveTime, end: NaiveTime },
}

impl Restriction {
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, RestrictionError> {
        if end < start {
            return Err(RestrictionError::InvertedWindow { start, end });
        }
        Ok(Self { day, start, end })
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// True if `now` falls on the restricted day, inside the window. Both ends inclusive,
    /// compared in whole seconds since midnight.
    pub fn covers(&self, now: NaiveDateTime) -> bool {
        if now.weekday() != self.day {
            return false;
        }
        let now_sec = now.time().num_seconds_from_midnight();
        let start_sec = self.start.num_seconds_from_midnight();
        let end_sec = self.end.num_seconds_from_midnight();
        (start_sec..=end_sec).contains(&now_sec)
    }
}

/// A single spot from one fetch. `id` is the only identity carried across fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingSpot {
    pub id: String,
    pub location: Coordinate,
    /// Street name or other human label.
    pub label: String,
    pub status: SpotStatus,
    pub restriction: Option<Restriction>,
    pub last_reported_at: Option<DateTime<Utc>>,
}

/// Backend ids are integers on some deployments and strings on others.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Text(s) => f.write_str(s),
            RecordId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Spot as it appears in the `/closest-parking-lots` JSON array.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotRecord {
    pub id: RecordId,
    pub latitude: f64,
    pub longitude: f64,
    pub street_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub last_reported_at: Option<DateTime<Utc>>,
}

impl From<SpotRecord> for ParkingSpot {
    fn from(r: SpotRecord) -> Self {
        let id = r.id.to_string();
        let restriction = restriction_from_fields(
            &id,
            r.day.as_deref(),
            r.start_time.as_deref(),
            r.end_time.as_deref(),
        );
        ParkingSpot {
            location: Coordinate::new(r.latitude, r.longitude),
            label: r.street_name,
            status: r.status.as_deref().map(SpotStatus::parse).unwrap_or(SpotStatus::Unknown),
            restriction,
            last_reported_at: r.last_reported_at,
            id,
        }
    }
}

/// Accepts "HH:MM" or "HH:MM:SS".
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// All three fields present and valid, or no restriction at all.
fn restriction_from_fields(
    id: &str,
    day: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Option<Restriction> {
    let (day, start, end) = match (day, start, end) {
        (None, None, None) => return None,
        (Some(d), Some(s), Some(e)) => (d, s, e),
        _ => {
            warn!(spot = id, "partial restriction data, treating spot as unrestricted");
            return None;
        }
    };
    let parsed = day
        .trim()
        .parse::<Weekday>()
        .ok()
        .zip(parse_time_of_day(start))
        .zip(parse_time_of_day(end));
    let Some(((day, start), end)) = parsed else {
        warn!(
            spot = id,
            day,
            start,
            end,
            "unparseable restriction, treating spot as unrestricted"
        );
        return None;
    };
    match Restriction::new(day, start, end) {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(spot = id, error = %e, "rejecting restriction");
            None
        }
    }
}
