//! The election service: every operation on candidates, the schedule and the
//! vote ledger goes through a [`Platform`].

use chrono::{DateTime, Utc};
use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result, StateConflict};
use crate::model::{
    ballot::{BallotRequest, VoteReceipt},
    candidate::{
        Candidate, CandidateId, CandidateRegistry, CandidateSpec, CandidateView, NewCandidate,
    },
    clock::{ElectionSchedule, ElectionStatus},
    eligibility::Electorate,
    identity::VoterIdentity,
    ledger::VoteLedger,
    results::{self, ElectionResults, ExportRow},
};
use crate::store::{Store, StoreError};

/// Everything guarded by the platform lock.
#[derive(Debug)]
struct ElectionState {
    registry: CandidateRegistry,
    schedule: ElectionSchedule,
    ledger: VoteLedger,
}

/// Owns the election state and its store.
///
/// Mutations hold the write lock across check, store write and in-memory
/// update, so they are serialised and a failed store write changes nothing.
pub struct Platform {
    state: RwLock<ElectionState>,
    store: Box<dyn Store>,
    electorate: Electorate,
}

impl Platform {
    /// Rebuild the platform from whatever the store holds.
    pub async fn load(store: Box<dyn Store>, electorate: Electorate) -> Result<Self> {
        let snapshot = store.load().await?;
        let ledger = VoteLedger::from_ballots(snapshot.ballots)?;
        info!(
            "Loaded {} candidates and {} ballots",
            snapshot.candidates.len(),
            ledger.total_votes()
        );
        Ok(Self {
            state: RwLock::new(ElectionState {
                registry: CandidateRegistry::new(snapshot.candidates),
                schedule: snapshot.schedule,
                ledger,
            }),
            store,
            electorate,
        })
    }

    pub fn electorate(&self) -> &Electorate {
        &self.electorate
    }

    pub async fn list_candidates(&self, include_private: bool) -> Vec<CandidateView> {
        self.state.read().await.registry.list(include_private)
    }

    pub async fn add_candidate(
        &self,
        fields: CandidateSpec,
        now: DateTime<Utc>,
    ) -> Result<Candidate> {
        let candidate = NewCandidate::try_from(fields)?;

        let mut state = self.state.write().await;
        if state.schedule.is_open(now) {
            return Err(StateConflict::ElectionOpen.into());
        }
        let id = self.store.allocate_candidate_id().await?;
        let candidate = Candidate::new(id, candidate);
        self.store.insert_candidate(&candidate).await?;
        state.registry.insert(candidate.clone());

        info!("Added candidate {} ({})", candidate.id, candidate.profile.name);
        Ok(candidate)
    }

    pub async fn remove_candidate(&self, id: CandidateId, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        if state.schedule.is_open(now) {
            return Err(StateConflict::ElectionOpen.into());
        }
        if !state.registry.contains(id) {
            return Err(Error::not_found(format!("Candidate {id} not found")));
        }
        self.store.delete_candidate(id).await?;
        state.registry.remove(id);

        info!("Removed candidate {id}");
        Ok(())
    }

    pub async fn election_status(&self, now: DateTime<Utc>) -> ElectionStatus {
        self.state.read().await.schedule.status(now)
    }

    /// Replace the voting window with `[start, end)`, clearing the manual flag.
    pub async fn schedule_election(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ElectionSchedule> {
        let schedule = ElectionSchedule::new(start, end)?;

        let mut state = self.state.write().await;
        self.store.save_schedule(&schedule).await?;
        state.schedule = schedule.clone();

        info!("Election scheduled from {start} to {end}");
        Ok(schedule)
    }

    /// Flip the manual override flag, returning its new value.
    pub async fn toggle_election(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        let mut schedule = state.schedule.clone();
        let flag = schedule.toggle();
        self.store.save_schedule(&schedule).await?;
        state.schedule = schedule;

        info!("Manual election flag set to {flag}");
        Ok(flag)
    }

    /// Cast a ballot for `identity`.
    pub async fn submit_vote(
        &self,
        identity: Option<&VoterIdentity>,
        request: BallotRequest,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt> {
        let mut state = self.state.write().await;
        let ballot = state
            .ledger
            .admit(&state.schedule, &self.electorate, identity, request, now)?;

        match self.store.insert_ballot(&ballot).await {
            Ok(()) => {}
            Err(StoreError::DuplicateVoter(voter)) => {
                warn!("Store already holds a ballot for voter {voter}");
                return Err(StateConflict::AlreadyVoted.into());
            }
            Err(e) => return Err(e.into()),
        }
        let receipt = VoteReceipt::from(&ballot);
        state.ledger.append(ballot)?;

        info!(
            "Accepted ballot {} ({} votes recorded)",
            receipt.ballot_id,
            state.ledger.total_votes()
        );
        Ok(receipt)
    }

    /// Tabulated results, withheld while voting is in progress.
    pub async fn results(&self, now: DateTime<Utc>) -> ElectionResults {
        let state = self.state.read().await;
        if state.schedule.is_open(now) {
            return ElectionResults::withheld();
        }
        results::tabulate(&state.registry, &state.ledger)
    }

    /// Every ballot with candidate names resolved. Refused while voting is in progress.
    pub async fn export_votes(&self, now: DateTime<Utc>) -> Result<Vec<ExportRow>> {
        let state = self.state.read().await;
        if state.schedule.is_open(now) {
            return Err(StateConflict::ElectionOpen.into());
        }
        Ok(results::export(&state.registry, &state.ledger))
    }

    pub async fn has_voted(&self, user_id: &str) -> bool {
        self.state.read().await.ledger.has_voted(user_id)
    }
}
