mod ballot_api;
pub mod db;
mod election_api;
mod gate;
mod session;
pub mod store;
mod voter_api;

#[cfg(test)]
mod tests;

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{HttpError, StoreError};
use store::Store;

const JSON_BODY_LIMIT: u64 = 64 * 1024;

/// Shared by every request handler.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>, clock: Arc<dyn Clock>) -> Self {
        Context { store, config, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current time in the offset election dates are written in.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.config.utc_offset)
    }

    /// Runs blocking store work off the async executor.
    pub async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Store) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || work(store.as_ref())).await?
    }
}

/// Turns any error the handlers produce into the response sent for it.
fn halt(err: impl Into<HttpError>) -> Response {
    err.into().into_response()
}

/// Handlers short-circuit with a ready response, so both arms are replies.
async fn settle(handler: impl Future<Output = Result<Response, Response>>) -> Result<Response, Infallible> {
    Ok(match handler.await {
        Ok(response) => response,
        Err(response) => response,
    })
}

/// Bounded JSON body of any deserializable type.
fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Copy {
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

/// Path and query of the request, handed back as the sign-in callback.
fn destination() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::path::full()
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .map(|path: FullPath, query: String| {
            if query.is_empty() {
                path.as_str().to_string()
            } else {
                format!("{}?{query}", path.as_str())
            }
        })
}

pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_ctx = warp::any().map(move || ctx.clone());

    let get_election = warp::path!("api" / "election" / String)
        .and(warp::get())
        .and(session::caller())
        .and(destination())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, ctx| settle(election_api::get(slug, caller, callback, ctx)));

    let create_election = warp::path!("api" / "election")
        .and(warp::post())
        .and(session::caller())
        .and(json_body())
        .and(with_ctx.clone())
        .and_then(|caller, settings, ctx| settle(election_api::create(caller, settings, ctx)));

    let update_election = warp::path!("api" / "election" / String)
        .and(warp::patch())
        .and(session::caller())
        .and(destination())
        .and(json_body())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, update, ctx| {
            settle(election_api::update(slug, caller, callback, update, ctx))
        });

    let delete_election = warp::path!("api" / "election" / String)
        .and(warp::delete())
        .and(session::caller())
        .and(destination())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, ctx| settle(election_api::delete(slug, caller, callback, ctx)));

    let get_positions = warp::path!("api" / "election" / String / "positions")
        .and(warp::get())
        .and(session::caller())
        .and(destination())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, ctx| settle(ballot_api::positions(slug, caller, callback, ctx)));

    let add_position = warp::path!("api" / "election" / String / "positions")
        .and(warp::post())
        .and(session::caller())
        .and(destination())
        .and(json_body())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, position, ctx| {
            settle(ballot_api::add_position(slug, caller, callback, position, ctx))
        });

    let cast_ballot = warp::path!("api" / "election" / String / "ballot")
        .and(warp::post())
        .and(session::caller())
        .and(destination())
        .and(json_body())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, ballot, ctx| settle(ballot_api::cast(slug, caller, callback, ballot, ctx)));

    let add_voter = warp::path!("api" / "election" / String / "voters")
        .and(warp::post())
        .and(session::caller())
        .and(destination())
        .and(json_body())
        .and(with_ctx.clone())
        .and_then(|slug, caller, callback, voter, ctx| settle(voter_api::add(slug, caller, callback, voter, ctx)));

    let remove_voter = warp::path!("api" / "election" / String / "voters" / Uuid)
        .and(warp::delete())
        .and(session::caller())
        .and(destination())
        .and(with_ctx)
        .and_then(|slug, user_id, caller, callback, ctx| {
            settle(voter_api::remove(slug, user_id, caller, callback, ctx))
        });

    get_election
        .or(create_election)
        .or(update_election)
        .or(delete_election)
        .or(get_positions)
        .or(add_position)
        .or(cast_ballot)
        .or(add_voter)
        .or(remove_voter)
        .recover(recover)
        .with(warp::trace::request())
}

async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let err = if rejection.is_not_found() {
        HttpError::new(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(body) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        HttpError::new(StatusCode::BAD_REQUEST, body.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        HttpError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        HttpError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        warn!(?rejection, "unhandled rejection");
        HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(err.into_response())
}

pub async fn setup(config: Config, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Result<(), warp::Error> {
    let address = config.bind_address;
    let ctx = Context::new(store, Arc::new(config), clock);

    let (bound, server) = warp::serve(routes(ctx))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())?;
    info!("Server running on {bound}");
    server.await;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            },
            Err(err) => {
                warn!("Failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
