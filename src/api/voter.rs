use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::auth::{AuthToken, Voter},
    ballot::{BallotRequest, VoteReceipt},
};
use crate::platform::Platform;

pub fn routes() -> Vec<Route> {
    routes![submit_vote]
}

/// Anonymous callers still reach the handler, so a closed election is
/// reported before a missing login.
#[post("/votes", data = "<ballot>", format = "json")]
async fn submit_vote(
    token: Option<AuthToken<Voter>>,
    ballot: Json<BallotRequest>,
    platform: &State<Platform>,
) -> Result<Json<VoteReceipt>> {
    let identity = token.map(|token| token.identity);
    let receipt = platform
        .submit_vote(identity.as_ref(), ballot.into_inner(), Utc::now())
        .await?;
    Ok(Json(receipt))
}
