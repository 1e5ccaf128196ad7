use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    candidate::{CandidateId, CandidateRegistry},
    ledger::VoteLedger,
};

pub const RESULTS_WITHHELD: &str =
    "Election is currently open. Results will be available after the election closes.";

/// Vote counts for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub id: CandidateId,
    pub name: String,
    pub council_votes: u64,
    pub executive_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub is_open: bool,
    pub total_votes: usize,
    pub results: Vec<CandidateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ElectionResults {
    /// Placeholder returned while voting is in progress.
    pub fn withheld() -> Self {
        Self {
            is_open: true,
            total_votes: 0,
            results: Vec::new(),
            message: Some(RESULTS_WITHHELD.to_string()),
        }
    }
}

/// Count the ledger against the registry.
///
/// Ballot entries naming an unregistered candidate are ignored. Ranking is by
/// council votes, then executive votes, both descending; remaining ties keep
/// registry (ascending ID) order.
pub fn tabulate(registry: &CandidateRegistry, ledger: &VoteLedger) -> ElectionResults {
    let mut results = registry
        .iter()
        .map(|candidate| CandidateResult {
            id: candidate.id,
            name: candidate.profile.name.clone(),
            council_votes: 0,
            executive_votes: 0,
        })
        .collect::<Vec<_>>();
    let index = results
        .iter()
        .enumerate()
        .map(|(position, result)| (result.id, position))
        .collect::<HashMap<_, _>>();

    for ballot in ledger.ballots() {
        for id in &ballot.selected_candidates {
            if let Some(&position) = index.get(id) {
                results[position].council_votes += 1;
            }
        }
        for id in &ballot.executive_candidates {
            if let Some(&position) = index.get(id) {
                results[position].executive_votes += 1;
            }
        }
    }

    // `sort_by_key` is stable, which is what fixes the final tie-break.
    results.sort_by_key(|result| (Reverse(result.council_votes), Reverse(result.executive_votes)));

    ElectionResults {
        is_open: false,
        total_votes: ledger.total_votes(),
        results,
        message: None,
    }
}

/// One exported ballot, with candidate IDs resolved to names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub voter_id: String,
    pub timestamp: DateTime<Utc>,
    /// The executive slate, in ballot order.
    pub executive: Vec<String>,
    /// Council picks not already on the executive slate, in ballot order.
    pub council: Vec<String>,
}

pub fn export(registry: &CandidateRegistry, ledger: &VoteLedger) -> Vec<ExportRow> {
    let name_of = |id: &CandidateId| {
        registry
            .get(*id)
            .map(|candidate| candidate.profile.name.clone())
            .unwrap_or_else(|| format!("Unknown ID: {id}"))
    };

    ledger
        .ballots()
        .iter()
        .map(|ballot| ExportRow {
            voter_id: ballot.voter_id.clone(),
            timestamp: ballot.timestamp,
            executive: ballot.executive_candidates.iter().map(name_of).collect(),
            council: ballot
                .selected_candidates
                .iter()
                .filter(|id| !ballot.executive_candidates.contains(id))
                .map(name_of)
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ballot::{Ballot, Selection},
        candidate::Candidate,
    };

    fn registry(ids: impl IntoIterator<Item = CandidateId>) -> CandidateRegistry {
        CandidateRegistry::new(ids.into_iter().map(Candidate::example).collect())
    }

    fn ballot(voter: &str, selected: Vec<CandidateId>, executive: Vec<CandidateId>) -> Ballot {
        Ballot::new(voter, Selection::new(selected, executive).unwrap(), Utc::now())
    }

    #[test]
    fn counts_council_and_executive_votes_separately() {
        let registry = registry(1..=5);
        let mut ledger = VoteLedger::default();
        // Candidates 1..=5 are registered; the remaining picks are unknown IDs.
        let selected = (1..=5).chain(100..110).collect::<Vec<_>>();
        let executive = vec![1, 100, 101, 102, 103, 104, 105];
        ledger.append(ballot("voter-a", selected, executive)).unwrap();

        let results = tabulate(&registry, &ledger);
        assert!(!results.is_open);
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.results.len(), 5);

        let first = &results.results[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.council_votes, 1);
        assert_eq!(first.executive_votes, 1);
        for other in &results.results[1..] {
            assert_eq!(other.council_votes, 1);
            assert_eq!(other.executive_votes, 0);
        }
    }

    #[test]
    fn ranking_breaks_ties_by_executive_then_registry_order() {
        let registry = registry(1..=30);
        let mut ledger = VoteLedger::default();
        ledger
            .append(ballot("voter-a", (1..=15).collect(), (9..=15).collect()))
            .unwrap();
        ledger
            .append(ballot("voter-b", (1..=15).collect(), (1..=7).collect()))
            .unwrap();

        let results = tabulate(&registry, &ledger);
        let order = results.results.iter().map(|r| r.id).collect::<Vec<_>>();
        // Two council votes each for 1..=15; 8 is the only one with no executive vote.
        let mut expected = (1..=7).chain(9..=15).collect::<Vec<_>>();
        expected.push(8);
        expected.extend(16..=30);
        assert_eq!(order, expected);
    }

    #[test]
    fn total_is_the_number_of_voters() {
        let registry = registry(1..=3);
        let mut ledger = VoteLedger::default();
        for voter in ["a", "b", "c"] {
            ledger
                .append(ballot(voter, (50..65).collect(), (50..57).collect()))
                .unwrap();
        }
        let results = tabulate(&registry, &ledger);
        assert_eq!(results.total_votes, 3);
        assert!(results.results.iter().all(|r| r.council_votes == 0));
    }

    #[test]
    fn tabulation_is_repeatable() {
        let registry = registry(1..=20);
        let mut ledger = VoteLedger::default();
        ledger
            .append(ballot("voter-a", (3..=17).collect(), (5..=11).collect()))
            .unwrap();
        assert_eq!(tabulate(&registry, &ledger), tabulate(&registry, &ledger));
    }

    #[test]
    fn export_splits_executive_from_council() {
        let registry = registry(1..=14);
        let mut ledger = VoteLedger::default();
        ledger
            .append(ballot("voter-a", (1..=15).collect(), (1..=7).collect()))
            .unwrap();

        let rows = export(&registry, &ledger);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].voter_id, "voter-a");
        assert_eq!(rows[0].executive.len(), 7);
        assert_eq!(rows[0].executive[0], "Candidate 1");
        assert_eq!(rows[0].council.len(), 8);
        assert_eq!(rows[0].council[0], "Candidate 8");
        assert_eq!(rows[0].council[7], "Unknown ID: 15");
    }
}
