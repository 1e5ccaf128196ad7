use std::fmt::{Display, Formatter};

use jsonwebtoken::errors::Error as JwtError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::IdentityError;
use crate::model::ballot::{COUNCIL_SEATS, EXECUTIVE_SEATS};
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable, machine-readable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    MalformedBallot,
    WrongSelectionCount,
    DuplicateSelection,
    ExecutiveNotInCouncil,
    MissingName,
    MissingBio,
    InvalidSchedule,
    InvalidTimestamp,
    NotFound,
    NotAuthenticated,
    NotEligible,
    AdminRequired,
    AlreadyVoted,
    ElectionOpen,
    ElectionClosed,
    StorageFailure,
    IdentityFailure,
    BadRequest,
    MalformedRequest,
    InternalError,
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::MalformedBallot => "malformed_ballot",
            Self::WrongSelectionCount => "wrong_selection_count",
            Self::DuplicateSelection => "duplicate_selection",
            Self::ExecutiveNotInCouncil => "executive_not_in_council",
            Self::MissingName => "missing_name",
            Self::MissingBio => "missing_bio",
            Self::InvalidSchedule => "invalid_schedule",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::NotFound => "not_found",
            Self::NotAuthenticated => "not_authenticated",
            Self::NotEligible => "not_eligible",
            Self::AdminRequired => "admin_required",
            Self::AlreadyVoted => "already_voted",
            Self::ElectionOpen => "election_open",
            Self::ElectionClosed => "election_closed",
            Self::StorageFailure => "storage_failure",
            Self::IdentityFailure => "identity_failure",
            Self::BadRequest => "bad_request",
            Self::MalformedRequest => "malformed_request",
            Self::InternalError => "internal_error",
        };
        f.write_str(code)
    }
}

/// Malformed input. Always recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Selections must be lists of candidate IDs")]
    MalformedBallot,
    #[error(
        "Exactly {} council and {} executive selections are required, got {selected} and {executive}",
        COUNCIL_SEATS,
        EXECUTIVE_SEATS
    )]
    WrongSelectionCount { selected: usize, executive: usize },
    #[error("Duplicate selections are not allowed")]
    DuplicateSelection,
    #[error("All executive candidates must also be selected as council members")]
    ExecutiveNotInCouncil,
    #[error("Candidate name is required")]
    MissingName,
    #[error("Candidate bio is required")]
    MissingBio,
    #[error("Start time must be before end time")]
    InvalidSchedule,
    #[error("Invalid timestamp '{0}', use ISO 8601 with an offset (e.g. 2024-06-15T10:00:00Z)")]
    InvalidTimestamp(String),
}

impl ValidationError {
    pub fn reason(&self) -> Reason {
        match self {
            Self::MalformedBallot => Reason::MalformedBallot,
            Self::WrongSelectionCount { .. } => Reason::WrongSelectionCount,
            Self::DuplicateSelection => Reason::DuplicateSelection,
            Self::ExecutiveNotInCouncil => Reason::ExecutiveNotInCouncil,
            Self::MissingName => Reason::MissingName,
            Self::MissingBio => Reason::MissingBio,
            Self::InvalidSchedule => Reason::InvalidSchedule,
            Self::InvalidTimestamp(_) => Reason::InvalidTimestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Authentication required")]
    NotAuthenticated,
    #[error("You are not authorized to vote in this election")]
    NotEligible,
    #[error("Admin access required")]
    AdminRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateConflict {
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("The election is currently open")]
    ElectionOpen,
    #[error("The election is currently closed")]
    ElectionClosed,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    StateConflict(#[from] StateConflict),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn not_found(msg: String) -> Self {
        Self::NotFound(msg)
    }

    /// The stable code reported to callers.
    pub fn reason(&self) -> Reason {
        match self {
            Self::Validation(e) => e.reason(),
            Self::NotFound(_) => Reason::NotFound,
            Self::Authorization(AuthorizationError::NotAuthenticated) | Self::Jwt(_) => {
                Reason::NotAuthenticated
            }
            Self::Authorization(AuthorizationError::NotEligible) => Reason::NotEligible,
            Self::Authorization(AuthorizationError::AdminRequired) => Reason::AdminRequired,
            Self::StateConflict(StateConflict::AlreadyVoted) => Reason::AlreadyVoted,
            Self::StateConflict(StateConflict::ElectionOpen) => Reason::ElectionOpen,
            Self::StateConflict(StateConflict::ElectionClosed) => Reason::ElectionClosed,
            Self::Persistence(_) => Reason::StorageFailure,
            Self::Identity(_) => Reason::IdentityFailure,
            Self::BadRequest(_) => Reason::BadRequest,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Authorization(AuthorizationError::NotAuthenticated) | Self::Jwt(_) => {
                Status::Unauthorized
            }
            Self::Authorization(_) => Status::Forbidden,
            Self::StateConflict(_) => Status::Conflict,
            Self::Persistence(_) => Status::InternalServerError,
            Self::Identity(IdentityError::Rejected(_)) => Status::Unauthorized,
            Self::Identity(IdentityError::Transport(_)) => Status::BadGateway,
        }
    }

    /// The message shown to callers. Storage details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) => "Internal storage failure, please try again later".to_string(),
            Self::Identity(_) => "Failed to verify user identity".to_string(),
            Self::Jwt(_) => AuthorizationError::NotAuthenticated.to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub reason: Reason,
    pub message: String,
}

impl ErrorBody {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let reason = self.reason();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self}", req.uri(), reason),
            _ => warn!("{} rejected with {reason}: {self}", req.uri()),
        }
        let body = ErrorBody::new(reason, self.public_message());
        Custom(status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_match_serialised_form() {
        let reasons = [
            Reason::MalformedBallot,
            Reason::WrongSelectionCount,
            Reason::ExecutiveNotInCouncil,
            Reason::AlreadyVoted,
            Reason::ElectionClosed,
            Reason::StorageFailure,
        ];
        for reason in reasons {
            let json = rocket::serde::json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{reason}\""));
        }
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        let closed: Error = StateConflict::ElectionClosed.into();
        assert_eq!(closed.status(), Status::Conflict);
        assert_eq!(closed.reason(), Reason::ElectionClosed);

        let anonymous: Error = AuthorizationError::NotAuthenticated.into();
        assert_eq!(anonymous.status(), Status::Unauthorized);

        let ineligible: Error = AuthorizationError::NotEligible.into();
        assert_eq!(ineligible.status(), Status::Forbidden);
        assert_eq!(ineligible.reason(), Reason::NotEligible);

        let storage: Error = StoreError::Unavailable("disk on fire".to_string()).into();
        assert_eq!(storage.status(), Status::InternalServerError);
        assert!(!storage.public_message().contains("disk on fire"));
    }
}
