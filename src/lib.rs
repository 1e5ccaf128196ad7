#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use rocket::{Build, Rocket};

use crate::config::{Config, ConfigFairing, IdentityFairing, StoreFairing};
use crate::identity::IdentityProvider;
use crate::logging::LoggerFairing;
use crate::platform::Platform;

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod model;
pub mod platform;
pub mod store;

/// Build the server from the Rocket figment: config, store and identity
/// provider are all set up by fairings at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(IdentityFairing)
        .attach(LoggerFairing)
}

/// Build the server around already constructed parts.
pub fn rocket_for(
    config: Config,
    platform: Platform,
    identities: Arc<dyn IdentityProvider>,
) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(config)
        .manage(platform)
        .manage(identities)
        .attach(LoggerFairing)
}

#[cfg(test)]
mod tests {
    use log4rs_test_utils::test_logging::init_logging_once_for;
    use rocket::local::asynchronous::Client;

    use crate::logging::RequestId;

    #[test]
    fn request_ids_increase() {
        init_logging_once_for(["phoenix_backend"], None, None);
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
    }

    #[backend_test]
    async fn unknown_route_is_json(client: Client) {
        let response = client.get("/no/such/route").dispatch().await;
        assert_eq!(response.status(), rocket::http::Status::NotFound);
        let body: crate::error::ErrorBody =
            rocket::serde::json::serde_json::from_str(&response.into_string().await.unwrap())
                .unwrap();
        assert_eq!(body.reason, crate::error::Reason::NotFound);
    }
}
