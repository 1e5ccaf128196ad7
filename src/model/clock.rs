use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The stored election schedule.
///
/// Bounds are kept as RFC 3339 text exactly as persisted, and only interpreted
/// by [`ElectionSchedule::is_open`], so a damaged record can never be mistaken
/// for an open election.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSchedule {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Manual override flag. Recorded and reported, but the schedule decides openness.
    #[serde(default)]
    pub is_open: bool,
}

impl ElectionSchedule {
    /// Create a schedule covering `[start, end)`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidSchedule);
        }
        Ok(Self {
            start_time: Some(format_timestamp(start)),
            end_time: Some(format_timestamp(end)),
            is_open: false,
        })
    }

    /// Is voting in progress at `now`?
    ///
    /// Fails closed: a missing or unreadable bound means the election is closed.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        match self.bounds() {
            Some((start, end)) => start <= now && now < end,
            None => false,
        }
    }

    /// Both bounds, if set and readable.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, end) = match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => return None,
        };
        match (parse_timestamp(start), parse_timestamp(end)) {
            (Ok(start), Ok(end)) => Some((start, end)),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Stored election schedule is unreadable, treating as closed: {e}");
                None
            }
        }
    }

    /// Flip the manual override flag, returning its new value.
    pub fn toggle(&mut self) -> bool {
        self.is_open = !self.is_open;
        self.is_open
    }

    pub fn status(&self, now: DateTime<Utc>) -> ElectionStatus {
        ElectionStatus {
            is_open: self.is_open(now),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            manual_override: self.is_open,
        }
    }
}

/// API view of the election state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStatus {
    pub is_open: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub manual_override: bool,
}

/// Parse an ISO 8601 / RFC 3339 timestamp. An explicit offset (or `Z`) is required.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|datetime| datetime.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp(raw.to_string()))
}

pub fn format_timestamp(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
