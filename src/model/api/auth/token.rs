use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AuthorizationError, Error};
use crate::model::identity::VoterIdentity;
use crate::platform::Platform;

use super::user::User;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token for a signed-in user, checked for the rights of `U`.
///
/// Only the identity is carried. Admin and voter status come from the
/// allow-lists each time the token is presented.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    #[serde(flatten)]
    pub identity: VoterIdentity,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Create a new [`AuthToken`] for the given identity.
    pub fn new(identity: VoterIdentity) -> Self {
        Self {
            identity,
            phantom: PhantomData,
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        // Lax rather than Strict: the cookie is set on the redirect back from the provider.
        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that its holder currently
    /// has the rights of this user type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = req
            .rocket()
            .state::<Config>()
            .expect("Config is always managed");
        let platform = req
            .rocket()
            .state::<Platform>()
            .expect("Platform is always managed");

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => return not_authenticated(),
        };
        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected auth token: {e}");
                return not_authenticated();
            }
        };

        match U::RIGHTS.check(&token.identity, platform.electorate()) {
            Ok(()) => Outcome::Success(token),
            Err(e) => {
                warn!("{} denied {} rights", token.identity.email, U::RIGHTS);
                Outcome::Failure((Status::Forbidden, e.into()))
            }
        }
    }
}

fn not_authenticated<T>() -> Outcome<T, Error> {
    Outcome::Failure((
        Status::Unauthorized,
        AuthorizationError::NotAuthenticated.into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::api::auth::{Admin, Voter};

    #[test]
    fn token_round_trips_through_cookie() {
        let config = Config::example();
        let cookie = AuthToken::<Voter>::new(VoterIdentity::voter_example()).into_cookie(&config);
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.http_only(), Some(true));

        let token = AuthToken::<Admin>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(token.identity, VoterIdentity::voter_example());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = Config::example();
        let cookie = AuthToken::<Voter>::new(VoterIdentity::voter_example()).into_cookie(&config);
        let tampered = Cookie::new(AUTH_TOKEN_COOKIE, format!("{}x", cookie.value()));
        assert!(AuthToken::<Voter>::from_cookie(&tampered, &config).is_err());
    }
}
