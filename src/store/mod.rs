//! Durable storage for the election state.
//!
//! The [`Platform`](crate::platform::Platform) keeps the working state in memory
//! and writes every change through a [`Store`] before applying it, so a failed
//! write leaves the in-memory state untouched.

use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    ballot::Ballot,
    candidate::{Candidate, CandidateId},
    clock::ElectionSchedule,
};

mod memory;
pub(crate) mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Voter {0} already has a ballot on record")]
    DuplicateVoter(String),
    #[error("Stored data is inconsistent: {0}")]
    Corrupt(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Everything needed to rebuild the election state at startup.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub candidates: Vec<Candidate>,
    pub schedule: ElectionSchedule,
    /// In the order they were cast.
    pub ballots: Vec<Ballot>,
}

/// Crash-safe persistence for candidates, the schedule and the vote ledger.
///
/// Every write is atomic on its own. `insert_ballot` must refuse a second
/// ballot for a voter with [`StoreError::DuplicateVoter`].
#[rocket::async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Hand out a candidate ID that has never been handed out before.
    async fn allocate_candidate_id(&self) -> Result<CandidateId, StoreError>;

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<(), StoreError>;

    async fn delete_candidate(&self, id: CandidateId) -> Result<(), StoreError>;

    async fn save_schedule(&self, schedule: &ElectionSchedule) -> Result<(), StoreError>;

    async fn insert_ballot(&self, ballot: &Ballot) -> Result<(), StoreError>;
}

#[cfg(test)]
mod examples {
    use chrono::{Duration, Utc};

    use super::*;

    impl Snapshot {
        /// Candidates 1 to 30 and no ballots. The election window either
        /// contains the current time or ended an hour ago.
        pub fn example(open: bool) -> Self {
            let now = Utc::now();
            let schedule = if open {
                ElectionSchedule::new(now - Duration::hours(1), now + Duration::hours(1))
            } else {
                ElectionSchedule::new(now - Duration::hours(3), now - Duration::hours(1))
            }
            .unwrap();
            Self {
                candidates: (1..=30).map(Candidate::example).collect(),
                schedule,
                ballots: Vec::new(),
            }
        }
    }
}
