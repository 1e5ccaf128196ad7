use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::Level;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Status, StatusClass},
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

use crate::platform::Platform;

/// Sequence number of a request, as it appears in the logs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Take the next number. Wraps to zero on overflow.
    pub fn next() -> RequestId {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// What the logger remembers about a request between arrival and response.
#[derive(Debug)]
struct RequestContext {
    id: RequestId,
    arrived: Instant,
}

impl RequestContext {
    /// The context of `req`, created on first use.
    fn of<'r>(req: &'r Request<'_>) -> &'r RequestContext {
        req.local_cache(|| RequestContext {
            id: RequestId::next(),
            arrived: Instant::now(),
        })
    }

    fn elapsed(&self) -> Duration {
        self.arrived.elapsed()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(RequestContext::of(req).id)
    }
}

/// Server errors are errors, client errors are warnings.
fn level_for(status: Status) -> Level {
    match status.class() {
        StatusClass::ServerError => Level::Error,
        StatusClass::ClientError => Level::Warn,
        _ => Level::Info,
    }
}

/// `name (uri)` of the route that handled `req`, if any did.
fn route_label(req: &Request<'_>) -> String {
    match req.route() {
        Some(route) => match &route.name {
            Some(name) => format!("{name} ({})", route.uri),
            None => route.uri.to_string(),
        },
        None => "no route".to_string(),
    }
}

/// Logs server lifecycle events and one line per request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!("Listening on {scheme}://{}:{}", config.address, config.port);

        let Some(platform) = rocket.state::<Platform>() else {
            return;
        };
        let status = platform.election_status(Utc::now()).await;
        match (status.start_time, status.end_time) {
            (Some(start), Some(end)) => info!(
                "Election window {start} to {end}, currently {}",
                if status.is_open { "open" } else { "closed" }
            ),
            _ => info!("No election window scheduled yet"),
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let context = RequestContext::of(req);
        info!("->req{} {} {}", context.id, req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let context = RequestContext::of(req);
        let status = res.status();
        log::log!(
            level_for(status),
            "<-rsp{} {status} {} in {}ms",
            context.id,
            route_label(req),
            context.elapsed().as_millis()
        );
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutting down, waiting for in-flight requests...");
    }
}
