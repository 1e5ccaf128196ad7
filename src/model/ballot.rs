use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{candidate::CandidateId, mongodb::Id};

/// Size of the full council slate on every ballot.
pub const COUNCIL_SEATS: usize = 15;
/// Size of the executive slate, drawn from the council slate.
pub const EXECUTIVE_SEATS: usize = 7;

/// A ballot as submitted, before any checking.
///
/// The selections are deliberately untyped so that a wrongly shaped body is
/// reported as a malformed ballot rather than a generic parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRequest {
    #[serde(default)]
    pub selected_candidates: Value,
    #[serde(default)]
    pub executive_candidates: Value,
}

impl BallotRequest {
    /// Run every shape rule, in order, returning the typed selection.
    pub fn into_selection(self) -> Result<Selection, ValidationError> {
        let selected = candidate_ids(&self.selected_candidates);
        let executive = candidate_ids(&self.executive_candidates);
        match (selected, executive) {
            (Some(selected), Some(executive)) => Selection::new(selected, executive),
            _ => Err(ValidationError::MalformedBallot),
        }
    }
}

fn candidate_ids(value: &Value) -> Option<Vec<CandidateId>> {
    value
        .as_array()?
        .iter()
        .map(|id| id.as_u64().and_then(|id| CandidateId::try_from(id).ok()))
        .collect()
}

/// A shape-valid pair of council and executive slates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    selected: Vec<CandidateId>,
    executive: Vec<CandidateId>,
}

impl Selection {
    pub fn new(
        selected: Vec<CandidateId>,
        executive: Vec<CandidateId>,
    ) -> Result<Self, ValidationError> {
        validate(&selected, &executive)?;
        Ok(Self {
            selected,
            executive,
        })
    }

    pub fn selected(&self) -> &[CandidateId] {
        &self.selected
    }

    pub fn executive(&self) -> &[CandidateId] {
        &self.executive
    }
}

/// Check slate sizes, uniqueness, and that the executive slate is drawn from the council slate.
///
/// Whether the IDs name registered candidates is not checked here.
pub fn validate(selected: &[CandidateId], executive: &[CandidateId]) -> Result<(), ValidationError> {
    if selected.len() != COUNCIL_SEATS || executive.len() != EXECUTIVE_SEATS {
        return Err(ValidationError::WrongSelectionCount {
            selected: selected.len(),
            executive: executive.len(),
        });
    }

    let council: HashSet<_> = selected.iter().collect();
    let executives: HashSet<_> = executive.iter().collect();
    if council.len() != selected.len() || executives.len() != executive.len() {
        return Err(ValidationError::DuplicateSelection);
    }

    if !executives.is_subset(&council) {
        return Err(ValidationError::ExecutiveNotInCouncil);
    }

    Ok(())
}

/// A cast ballot. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: String,
    pub selected_candidates: Vec<CandidateId>,
    pub executive_candidates: Vec<CandidateId>,
    /// Stored as a BSON date so the database orders ballots by cast time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl Ballot {
    pub fn new(voter_id: &str, selection: Selection, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            voter_id: voter_id.to_string(),
            selected_candidates: selection.selected,
            executive_candidates: selection.executive,
            timestamp: now,
        }
    }
}

/// Confirmation returned to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub ballot_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl From<&Ballot> for VoteReceipt {
    fn from(ballot: &Ballot) -> Self {
        Self {
            ballot_id: ballot.id.to_hex(),
            timestamp: ballot.timestamp,
            message: "Vote submitted successfully".to_string(),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use rocket::serde::json::json;

    use super::*;

    impl Selection {
        /// Council 1..=15, executive 1..=7.
        pub fn example() -> Self {
            Self::new((1..=15).collect(), (1..=7).collect()).unwrap()
        }

        /// Council 11..=25, executive 11..=17.
        pub fn example2() -> Self {
            Self::new((11..=25).collect(), (11..=17).collect()).unwrap()
        }
    }

    impl BallotRequest {
        pub fn new(selected: Vec<CandidateId>, executive: Vec<CandidateId>) -> Self {
            Self {
                selected_candidates: json!(selected),
                executive_candidates: json!(executive),
            }
        }

        pub fn example() -> Self {
            Self::new((1..=15).collect(), (1..=7).collect())
        }
    }
}
