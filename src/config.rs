use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::identity::{GoogleIdentityProvider, IdentityProvider};
use crate::model::eligibility::{Allowlist, Electorate};
use crate::platform::Platform;
use crate::store::{MemoryStore, MongoStore, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    frontend_url: String,
    auth_ttl: u32,
    #[serde(default)]
    admin_emails: Allowlist,
    #[serde(default)]
    eligible_voter_emails: Allowlist,
    google_client_id: String,
    google_redirect_uri: String,
    // secrets
    jwt_secret: String,
    google_client_secret: String,
}

impl Config {
    /// Where the browser is sent after logging in or out.
    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// The administrator and voter allow-lists.
    pub fn electorate(&self) -> Electorate {
        Electorate::new(
            self.admin_emails.clone(),
            self.eligible_voter_emails.clone(),
        )
    }

    pub fn google_provider(&self) -> GoogleIdentityProvider {
        GoogleIdentityProvider::new(
            self.google_client_id.clone(),
            self.google_client_secret.clone(),
            self.google_redirect_uri.clone(),
        )
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.admin_emails.is_empty() {
            warn!("No administrator emails configured");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: Option<String>,
    #[serde(default = "default_database_name")]
    db_name: String,
}

fn default_database_name() -> String {
    "phoenix".to_string()
}

/// A fairing that connects to the configured store, loads the election state
/// from it, and places the resulting [`Platform`] into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let electorate = match rocket.state::<Config>() {
            Some(config) => config.electorate(),
            None => {
                error!("Application config must be loaded before the store");
                return Err(rocket);
            }
        };

        let store: Box<dyn Store> = match config.db_uri {
            Some(uri) => {
                info!("Loaded database config, connecting...");
                let client = match MongoClient::with_uri_str(uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                let db = client.database(&config.db_name);
                match MongoStore::open(&db).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Box::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, votes will be kept in memory only");
                Box::new(MemoryStore::default())
            }
        };

        let platform = match Platform::load(store, electorate).await {
            Ok(platform) => platform,
            Err(e) => {
                error!("Failed to load election state: {e}");
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(platform);
        Ok(rocket)
    }
}

/// A fairing that sets up the Google identity provider.
///
/// Must be attached after [`ConfigFairing`].
pub struct IdentityFairing;

#[rocket::async_trait]
impl Fairing for IdentityFairing {
    fn info(&self) -> Info {
        Info {
            name: "Google identity provider",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let provider: Arc<dyn IdentityProvider> = match rocket.state::<Config>() {
            Some(config) => Arc::new(config.google_provider()),
            None => {
                error!("Application config must be loaded before the identity provider");
                return Err(rocket);
            }
        };
        info!("Loaded identity provider config");
        Ok(rocket.manage(provider))
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                frontend_url: "http://localhost:3000".to_string(),
                auth_ttl: 3600,
                admin_emails: Allowlist::new(["admin@example.com"]),
                eligible_voter_emails: Allowlist::new([
                    "voter@example.com",
                    "second.voter@example.com",
                ]),
                google_client_id: "test-client".to_string(),
                google_redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
                jwt_secret: "test-jwt-secret".to_string(),
                google_client_secret: "test-client-secret".to_string(),
            }
        }
    }
}
