use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Coll;
use crate::store::StoreError;

/// ID of the counter that hands out candidate IDs.
pub const CANDIDATE_ID_COUNTER_ID: &str = "candidate_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32, StoreError> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("Failed to find counter with ID {id}")))?;
        Ok(counter.next)
    }

    /// Ensure the counter exists and will never hand out a value below `floor`.
    ///
    /// The counter only ever moves forward, so IDs freed by deletion are not reused.
    pub async fn ensure_at_least(
        counters: &Coll<Counter>,
        id: &str,
        floor: u32,
    ) -> Result<(), StoreError> {
        let update = doc! {
            "$max": { "next": i64::from(floor) }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        counters
            .update_one(doc! { "_id": id }, update, options)
            .await?;
        Ok(())
    }
}
