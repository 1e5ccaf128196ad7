use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::model::{
    candidate::CandidateView, clock::ElectionStatus, results::ElectionResults,
};
use crate::platform::Platform;

pub fn routes() -> Vec<Route> {
    routes![candidates, election_status, results]
}

#[get("/candidates")]
async fn candidates(platform: &State<Platform>) -> Json<Vec<CandidateView>> {
    Json(platform.list_candidates(false).await)
}

#[get("/election/status")]
async fn election_status(platform: &State<Platform>) -> Json<ElectionStatus> {
    Json(platform.election_status(Utc::now()).await)
}

#[get("/results")]
async fn results(platform: &State<Platform>) -> Json<ElectionResults> {
    Json(platform.results(Utc::now()).await)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::{serde_json, Value},
    };

    use crate::model::results::RESULTS_WITHHELD;

    use super::*;

    #[backend_test]
    async fn public_listing_hides_private_fields(client: Client) {
        let response = client.get(uri!(candidates)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw = response.into_string().await.unwrap();
        let listing: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(listing.len(), 30);
        for candidate in &listing {
            let fields = candidate.as_object().unwrap();
            assert!(fields.contains_key("name"));
            for private in ["email", "phone", "place_of_birth", "residence", "field_of_expertise"] {
                assert!(!fields.contains_key(private), "{private} leaked");
            }
        }
        let ids: Vec<u64> = listing.iter().map(|c| c["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=30).collect::<Vec<_>>());
    }

    #[backend_test(open)]
    async fn status_while_open(client: Client) {
        let response = client.get(uri!(election_status)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let status: ElectionStatus =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(status.is_open);
        assert!(!status.manual_override);
        assert!(status.start_time.is_some());
    }

    #[backend_test(open)]
    async fn results_withheld_while_open(client: Client) {
        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(results.is_open);
        assert_eq!(results.total_votes, 0);
        assert!(results.results.is_empty());
        assert_eq!(results.message.as_deref(), Some(RESULTS_WITHHELD));
    }

    #[backend_test]
    async fn results_once_closed(client: Client) {
        let response = client.get(uri!(results)).dispatch().await;
        let results: ElectionResults =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(!results.is_open);
        assert_eq!(results.results.len(), 30);
        assert!(results.results.iter().all(|r| r.council_votes == 0));
    }
}
