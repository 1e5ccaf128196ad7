use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use rocket::{
    http::{Cookie, CookieJar, SameSite, Status},
    response::{status::Custom, Redirect},
    serde::json::Json,
    time::Duration,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    identity::IdentityProvider,
    model::api::{
        auth::{AuthToken, Voter, AUTH_TOKEN_COOKIE},
        election::Message,
        session::SessionInfo,
    },
    platform::Platform,
};

/// Private cookie holding the CSRF state of an in-flight login.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const OAUTH_STATE_LENGTH: usize = 32;

pub fn routes() -> Vec<Route> {
    routes![login, callback, session, logout]
}

#[get("/auth/google/login")]
pub fn login(cookies: &CookieJar<'_>, identities: &State<Arc<dyn IdentityProvider>>) -> Redirect {
    let state: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LENGTH)
        .map(char::from)
        .collect();

    let url = identities.authorization_url(&state);
    cookies.add_private(
        Cookie::build(OAUTH_STATE_COOKIE, state)
            .max_age(Duration::minutes(10))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .finish(),
    );

    Redirect::to(url)
}

#[get("/auth/google/callback?<code>&<state>")]
pub async fn callback(
    code: Option<String>,
    state: Option<String>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    identities: &State<Arc<dyn IdentityProvider>>,
    platform: &State<Platform>,
) -> Result<Redirect> {
    // The state is single use.
    let expected = cookies
        .get_private(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    cookies.remove_private(Cookie::named(OAUTH_STATE_COOKIE));

    match (state, expected) {
        (Some(state), Some(expected)) if state == expected => {}
        _ => {
            warn!("CSRF check failed: login state missing or mismatched");
            return Err(Error::BadRequest("Invalid state parameter".to_string()));
        }
    }
    let code = code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::BadRequest("Authorization code not found".to_string()))?;

    let identity = identities.verify(&code).await?;

    let electorate = platform.electorate();
    if electorate.is_admin(&identity) {
        info!("{} signed in with admin access", identity.email);
    }
    if electorate.is_eligible(&identity) {
        info!("{} signed in as an eligible voter", identity.email);
    } else {
        info!("{} signed in but is not an eligible voter", identity.email);
    }

    cookies.add(AuthToken::<Voter>::new(identity).into_cookie(config));

    Ok(Redirect::to(format!(
        "{}?authenticated=true",
        config.frontend_url()
    )))
}

#[get("/auth/session")]
pub async fn session(
    token: Option<AuthToken<Voter>>,
    platform: &State<Platform>,
) -> Custom<Json<SessionInfo>> {
    let identity = match token {
        Some(token) => token.identity,
        None => return Custom(Status::Unauthorized, Json(SessionInfo::anonymous())),
    };

    let electorate = platform.electorate();
    let is_admin = electorate.is_admin(&identity);
    let is_eligible_voter = electorate.is_eligible(&identity);
    let has_voted = platform.has_voted(&identity.user_id).await;
    Custom(
        Status::Ok,
        Json(SessionInfo::signed_in(
            identity,
            is_admin,
            is_eligible_voter,
            has_voted,
        )),
    )
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Json<Message> {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Json(Message::new("Logged out successfully"))
}
