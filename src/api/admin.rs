use chrono::Utc;
use rocket::{http::Status, response::status::Custom, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{Admin, AuthToken},
        election::{Message, ScheduleRequest, ScheduleResponse, ToggleResponse},
    },
    candidate::{CandidateId, CandidateSpec, CandidateView, FullCandidate},
    results::ExportRow,
};
use crate::platform::Platform;

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        add_candidate,
        remove_candidate,
        schedule_election,
        toggle_election,
        export_votes,
    ]
}

#[get("/admin/candidates")]
async fn list_candidates(
    _token: AuthToken<Admin>,
    platform: &State<Platform>,
) -> Json<Vec<CandidateView>> {
    Json(platform.list_candidates(true).await)
}

#[post("/admin/candidates", data = "<candidate>", format = "json")]
async fn add_candidate(
    token: AuthToken<Admin>,
    candidate: Json<CandidateSpec>,
    platform: &State<Platform>,
) -> Result<Custom<Json<FullCandidate>>> {
    let candidate = platform
        .add_candidate(candidate.into_inner(), Utc::now())
        .await?;
    info!("Candidate {} added by {}", candidate.id, token.identity.email);
    Ok(Custom(Status::Created, Json(candidate.full())))
}

#[delete("/admin/candidates/<candidate_id>")]
async fn remove_candidate(
    token: AuthToken<Admin>,
    candidate_id: CandidateId,
    platform: &State<Platform>,
) -> Result<Json<Message>> {
    platform.remove_candidate(candidate_id, Utc::now()).await?;
    info!("Candidate {candidate_id} removed by {}", token.identity.email);
    Ok(Json(Message::new(format!(
        "Candidate {candidate_id} removed"
    ))))
}

#[post("/admin/election/schedule", data = "<schedule>", format = "json")]
async fn schedule_election(
    _token: AuthToken<Admin>,
    schedule: Json<ScheduleRequest>,
    platform: &State<Platform>,
) -> Result<Json<ScheduleResponse>> {
    let (start, end) = schedule.parse()?;
    let schedule = platform.schedule_election(start, end).await?;
    Ok(Json(schedule.into()))
}

#[post("/admin/election/toggle")]
async fn toggle_election(
    _token: AuthToken<Admin>,
    platform: &State<Platform>,
) -> Result<Json<ToggleResponse>> {
    let flag = platform.toggle_election().await?;
    Ok(Json(ToggleResponse::new(flag)))
}

#[get("/admin/votes/export")]
async fn export_votes(
    _token: AuthToken<Admin>,
    platform: &State<Platform>,
) -> Result<Json<Vec<ExportRow>>> {
    Ok(Json(platform.export_votes(Utc::now()).await?))
}
