//! Third-party identity verification.

use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::model::identity::VoterIdentity;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Identity provider rejected the login: {0}")]
    Rejected(String),
}

/// Something that can turn an authorization code into a verified identity.
#[rocket::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start a login, carrying `state` for CSRF protection.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the identity it belongs to.
    async fn verify(&self, code: &str) -> Result<VoterIdentity, IdentityError>;
}

/// Google OAuth 2 with the OpenID userinfo endpoint.
pub struct GoogleIdentityProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    userinfo_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: String,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            redirect_uri,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }

    /// Talk to different token and userinfo endpoints.
    #[cfg(test)]
    fn with_endpoints(mut self, token_url: String, userinfo_url: String) -> Self {
        self.token_url = token_url;
        self.userinfo_url = userinfo_url;
        self
    }
}

#[rocket::async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> String {
        let mut url = Url::parse(GOOGLE_AUTH_URL).expect("Google authorization URL is valid");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state)
            .append_pair("prompt", "select_account");
        url.into()
    }

    async fn verify(&self, code: &str) -> Result<VoterIdentity, IdentityError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let token: TokenResponse = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| IdentityError::Rejected(format!("code exchange failed: {e}")))?
            .json()
            .await?;

        let info: UserInfo = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| IdentityError::Rejected(format!("userinfo request refused: {e}")))?
            .json()
            .await?;

        let email = match info.email {
            Some(email) if info.email_verified => email,
            Some(email) => {
                return Err(IdentityError::Rejected(format!(
                    "email {email} is not verified"
                )))
            }
            None => return Err(IdentityError::Rejected("no email address".to_string())),
        };
        Ok(VoterIdentity::new(info.sub, email, info.name))
    }
}

#[cfg(test)]
pub use test_provider::StaticIdentityProvider;
