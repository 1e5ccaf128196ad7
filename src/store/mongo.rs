use mongodb::{
    bson::doc,
    options::{FindOptions, ReplaceOptions},
    Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::model::{
    ballot::Ballot,
    candidate::{Candidate, CandidateId},
    clock::ElectionSchedule,
    mongodb::{
        ensure_indexes_exist, is_duplicate_key_error, u32_id_filter, Coll, Counter,
        CANDIDATE_ID_COUNTER_ID,
    },
};

use super::{Snapshot, Store, StoreError};

/// The schedule lives in a single document with this ID.
const SCHEDULE_ID: &str = "current";

/// The election schedule as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSchedule {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    schedule: ElectionSchedule,
}

/// A [`Store`] backed by a MongoDB database.
pub struct MongoStore {
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    schedule: Coll<StoredSchedule>,
    counters: Coll<Counter>,
}

impl MongoStore {
    /// Open the store, creating any indexes it relies on.
    pub async fn open(db: &Database) -> Result<Self, StoreError> {
        ensure_indexes_exist(db).await?;
        Ok(Self {
            candidates: Coll::from_db(db),
            ballots: Coll::from_db(db),
            schedule: Coll::from_db(db),
            counters: Coll::from_db(db),
        })
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        let by_id = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let candidates: Vec<Candidate> = self
            .candidates
            .find(None, by_id)
            .await?
            .try_collect()
            .await?;

        // Never hand out an ID that is already in use, even if the counter was lost.
        let floor = candidates.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Counter::ensure_at_least(&self.counters, CANDIDATE_ID_COUNTER_ID, floor).await?;

        let schedule = self
            .schedule
            .find_one(doc! { "_id": SCHEDULE_ID }, None)
            .await?
            .map(|stored| stored.schedule)
            .unwrap_or_default();

        let by_cast_time = FindOptions::builder()
            .sort(doc! { "timestamp": 1, "_id": 1 })
            .build();
        let ballots: Vec<Ballot> = self
            .ballots
            .find(None, by_cast_time)
            .await?
            .try_collect()
            .await?;

        Ok(Snapshot {
            candidates,
            schedule,
            ballots,
        })
    }

    async fn allocate_candidate_id(&self) -> Result<CandidateId, StoreError> {
        Counter::next(&self.counters, CANDIDATE_ID_COUNTER_ID).await
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<(), StoreError> {
        self.candidates.insert_one(candidate, None).await?;
        Ok(())
    }

    async fn delete_candidate(&self, id: CandidateId) -> Result<(), StoreError> {
        self.candidates.delete_one(u32_id_filter(id), None).await?;
        Ok(())
    }

    async fn save_schedule(&self, schedule: &ElectionSchedule) -> Result<(), StoreError> {
        let stored = StoredSchedule {
            id: SCHEDULE_ID.to_string(),
            schedule: schedule.clone(),
        };
        let upsert = ReplaceOptions::builder().upsert(true).build();
        self.schedule
            .replace_one(doc! { "_id": SCHEDULE_ID }, stored, upsert)
            .await?;
        Ok(())
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> Result<(), StoreError> {
        match self.ballots.insert_one(ballot, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key_error(&err) => {
                Err(StoreError::DuplicateVoter(ballot.voter_id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// These run against a live server, e.g. `ROCKET_DB_URI=mongodb://localhost:27017
/// cargo test -- --ignored`. Each test gets its own database, dropped at the end.
#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use mongodb::{bson::oid::ObjectId, Client as MongoClient};

    use super::*;
    use crate::model::ballot::Selection;

    async fn fresh_database() -> Database {
        let uri = std::env::var("ROCKET_DB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let client = MongoClient::with_uri_str(uri).await.unwrap();
        client.database(&format!("phoenix_test_{}", ObjectId::new().to_hex()))
    }

    #[rocket::async_test]
    #[ignore = "needs a MongoDB server"]
    async fn second_ballot_for_a_voter_is_a_duplicate() {
        let db = fresh_database().await;
        let store = MongoStore::open(&db).await.unwrap();
        let now = Utc::now();

        store
            .insert_ballot(&Ballot::new("voter-a", Selection::example(), now))
            .await
            .unwrap();
        let second = store
            .insert_ballot(&Ballot::new("voter-a", Selection::example2(), now))
            .await;
        assert!(matches!(second, Err(StoreError::DuplicateVoter(voter)) if voter == "voter-a"));
        assert_eq!(store.load().await.unwrap().ballots.len(), 1);

        db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    #[ignore = "needs a MongoDB server"]
    async fn reload_restores_state_in_cast_order() {
        let db = fresh_database().await;
        let store = MongoStore::open(&db).await.unwrap();

        let whole = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let later = whole + Duration::milliseconds(100);
        // Inserted out of order: the fractional-second cast goes in first.
        let second = Ballot::new("voter-b", Selection::example2(), later);
        let first = Ballot::new("voter-a", Selection::example(), whole);
        store.insert_ballot(&second).await.unwrap();
        store.insert_ballot(&first).await.unwrap();

        store.insert_candidate(&Candidate::example(5)).await.unwrap();
        let schedule = ElectionSchedule::new(whole, whole + Duration::hours(8)).unwrap();
        store.save_schedule(&schedule).await.unwrap();

        let snapshot = store.load().await.unwrap();
        let voters: Vec<_> = snapshot.ballots.iter().map(|b| b.voter_id.as_str()).collect();
        assert_eq!(voters, ["voter-a", "voter-b"]);
        assert_eq!(snapshot.ballots[0].timestamp, whole);
        assert_eq!(snapshot.schedule, schedule);

        // The counter is seeded past the highest stored ID and never goes back.
        assert_eq!(store.allocate_candidate_id().await.unwrap(), 6);
        store.delete_candidate(5).await.unwrap();
        store.load().await.unwrap();
        assert_eq!(store.allocate_candidate_id().await.unwrap(), 7);

        db.drop(None).await.unwrap();
    }
}
