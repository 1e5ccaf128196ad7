use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rocket::tokio::sync::Mutex;

use crate::model::{
    ballot::Ballot,
    candidate::{Candidate, CandidateId},
    clock::ElectionSchedule,
};

use super::{Snapshot, Store, StoreError};

#[derive(Debug, Default)]
struct MemoryData {
    snapshot: Snapshot,
    next_candidate_id: CandidateId,
}

/// A non-durable store, for development and tests.
///
/// Clones share the same data, so a handle can be kept after the store has been
/// handed to a [`Platform`](crate::platform::Platform).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    /// A store pre-populated with the given state.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let next_candidate_id = snapshot
            .candidates
            .iter()
            .map(|candidate| candidate.id)
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            data: Arc::new(Mutex::new(MemoryData {
                snapshot,
                next_candidate_id,
            })),
            failing: Default::default(),
        }
    }

    /// Make every subsequent write fail, simulating a storage outage.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// A copy of the stored state.
    pub async fn snapshot(&self) -> Snapshot {
        self.data.lock().await.snapshot.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn allocate_candidate_id(&self) -> Result<CandidateId, StoreError> {
        self.check_available()?;
        let mut data = self.data.lock().await;
        let id = data.next_candidate_id.max(1);
        data.next_candidate_id = id + 1;
        Ok(id)
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<(), StoreError> {
        self.check_available()?;
        self.data
            .lock()
            .await
            .snapshot
            .candidates
            .push(candidate.clone());
        Ok(())
    }

    async fn delete_candidate(&self, id: CandidateId) -> Result<(), StoreError> {
        self.check_available()?;
        self.data
            .lock()
            .await
            .snapshot
            .candidates
            .retain(|candidate| candidate.id != id);
        Ok(())
    }

    async fn save_schedule(&self, schedule: &ElectionSchedule) -> Result<(), StoreError> {
        self.check_available()?;
        self.data.lock().await.snapshot.schedule = schedule.clone();
        Ok(())
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> Result<(), StoreError> {
        self.check_available()?;
        let mut data = self.data.lock().await;
        let ballots = &mut data.snapshot.ballots;
        if ballots.iter().any(|stored| stored.voter_id == ballot.voter_id) {
            return Err(StoreError::DuplicateVoter(ballot.voter_id.clone()));
        }
        ballots.push(ballot.clone());
        Ok(())
    }
}
