use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{AuthorizationError, Result, StateConflict};
use crate::model::{
    ballot::{Ballot, BallotRequest},
    clock::ElectionSchedule,
    eligibility::Electorate,
    identity::VoterIdentity,
};
use crate::store::StoreError;

/// The cast ballots plus the set of voters who cast them.
///
/// Invariant: `voter_ids` holds exactly the `voter_id` of every ballot, and
/// no voter appears twice.
#[derive(Debug, Default)]
pub struct VoteLedger {
    voter_ids: HashSet<String>,
    ballots: Vec<Ballot>,
}

impl VoteLedger {
    /// Rebuild a ledger from stored ballots, refusing a history with a double vote.
    pub fn from_ballots(ballots: Vec<Ballot>) -> std::result::Result<Self, StoreError> {
        let mut ledger = Self::default();
        for ballot in ballots {
            if ledger.voter_ids.contains(&ballot.voter_id) {
                return Err(StoreError::Corrupt(format!(
                    "voter {} has more than one stored ballot",
                    ballot.voter_id
                )));
            }
            ledger.voter_ids.insert(ballot.voter_id.clone());
            ledger.ballots.push(ballot);
        }
        Ok(ledger)
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voter_ids.contains(voter_id)
    }

    /// Number of distinct voters on record.
    pub fn total_votes(&self) -> usize {
        self.voter_ids.len()
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    /// Run the admission checks for a new ballot without recording it:
    /// the election must be open, the voter eligible and new, and the ballot well formed.
    pub fn admit(
        &self,
        schedule: &ElectionSchedule,
        electorate: &Electorate,
        identity: Option<&VoterIdentity>,
        request: BallotRequest,
        now: DateTime<Utc>,
    ) -> Result<Ballot> {
        if !schedule.is_open(now) {
            return Err(StateConflict::ElectionClosed.into());
        }
        electorate.can_vote(identity, self)?;
        let selection = request.into_selection()?;
        let voter = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        Ok(Ballot::new(&voter.user_id, selection, now))
    }

    /// Record an admitted ballot.
    pub fn append(&mut self, ballot: Ballot) -> Result<()> {
        if !self.voter_ids.insert(ballot.voter_id.clone()) {
            return Err(StateConflict::AlreadyVoted.into());
        }
        self.ballots.push(ballot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::Reason;
    use crate::model::ballot::Selection;

    fn open_schedule(now: DateTime<Utc>) -> ElectionSchedule {
        ElectionSchedule::new(now - Duration::hours(1), now + Duration::hours(1)).unwrap()
    }

    #[test]
    fn admitted_ballot_belongs_to_the_voter() {
        let now = Utc::now();
        let ledger = VoteLedger::default();
        let voter = VoterIdentity::voter_example();
        let ballot = ledger
            .admit(
                &open_schedule(now),
                &Electorate::example(),
                Some(&voter),
                BallotRequest::example(),
                now,
            )
            .unwrap();
        assert_eq!(ballot.voter_id, voter.user_id);
        assert_eq!(ballot.timestamp, now);
        assert_eq!(ballot.selected_candidates.len(), 15);
        // Admission alone records nothing.
        assert_eq!(ledger.total_votes(), 0);
    }

    #[test]
    fn closed_election_is_checked_first() {
        let now = Utc::now();
        let ledger = VoteLedger::default();
        let closed = ElectionSchedule::default();
        let error = ledger
            .admit(&closed, &Electorate::example(), None, BallotRequest::default(), now)
            .unwrap_err();
        assert_eq!(error.reason(), Reason::ElectionClosed);
    }

    #[test]
    fn eligibility_is_checked_before_shape() {
        let now = Utc::now();
        let ledger = VoteLedger::default();
        let outsider = VoterIdentity::ineligible_example();
        let error = ledger
            .admit(
                &open_schedule(now),
                &Electorate::example(),
                Some(&outsider),
                BallotRequest::default(),
                now,
            )
            .unwrap_err();
        assert_eq!(error.reason(), Reason::NotEligible);
    }

    #[test]
    fn append_never_records_a_voter_twice() {
        let now = Utc::now();
        let mut ledger = VoteLedger::default();
        ledger
            .append(Ballot::new("voter-a", Selection::example(), now))
            .unwrap();
        let error = ledger
            .append(Ballot::new("voter-a", Selection::example2(), now))
            .unwrap_err();
        assert_eq!(error.reason(), Reason::AlreadyVoted);
        assert_eq!(ledger.total_votes(), 1);
        assert_eq!(ledger.ballots().len(), 1);
    }

    #[test]
    fn stored_double_vote_is_corrupt() {
        let now = Utc::now();
        let ballots = vec![
            Ballot::new("voter-a", Selection::example(), now),
            Ballot::new("voter-b", Selection::example(), now),
            Ballot::new("voter-a", Selection::example2(), now),
        ];
        assert!(matches!(
            VoteLedger::from_ballots(ballots),
            Err(StoreError::Corrupt(_))
        ));
    }
}
