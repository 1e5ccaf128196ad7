use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::clock::{format_timestamp, parse_timestamp, ElectionSchedule};

/// A request to set the voting window. Both bounds are ISO 8601 with an offset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl ScheduleRequest {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Parse both bounds. Ordering is checked when the schedule is built.
    pub fn parse(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
        Ok((parse_timestamp(&self.start_time)?, parse_timestamp(&self.end_time)?))
    }
}

/// Confirmation of a new schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub message: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<ElectionSchedule> for ScheduleResponse {
    fn from(schedule: ElectionSchedule) -> Self {
        Self {
            message: "Election schedule updated successfully.".to_string(),
            start_time: schedule.start_time,
            end_time: schedule.end_time,
        }
    }
}

/// Result of flipping the manual election flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub message: String,
    pub is_open: bool,
}

impl ToggleResponse {
    pub fn new(flag: bool) -> Self {
        let state = if flag { "set" } else { "cleared" };
        Self {
            message: format!("Manual election flag {state}; voting follows the schedule"),
            is_open: flag,
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
