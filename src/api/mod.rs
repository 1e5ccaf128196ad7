use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{AuthorizationError, ErrorBody, Reason};

mod admin;
pub(crate) mod auth;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(auth::routes());
    routes.extend(voter::routes());
    routes
}

/// JSON bodies for errors raised outside a handler, e.g. by request guards.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new(Reason::BadRequest, "Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        Reason::NotAuthenticated,
        AuthorizationError::NotAuthenticated.to_string(),
    ))
}

#[catch(403)]
fn forbidden() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        Reason::AdminRequired,
        AuthorizationError::AdminRequired.to_string(),
    ))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(
        Reason::NotFound,
        format!("No resource at {}", req.uri()),
    ))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        Reason::MalformedRequest,
        "Request body could not be parsed",
    ))
}

#[catch(500)]
fn internal_error(status: Status, _req: &Request) -> Json<ErrorBody> {
    error!("Unhandled server error ({status})");
    Json(ErrorBody::new(Reason::InternalError, "Internal server error"))
}
