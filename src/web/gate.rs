use tracing::debug;
use url::Url;
use warp::http::header::LOCATION;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::config::Config;
use crate::error::{self, HttpError};
use crate::voting::{self, Caller, Decision, Election, Membership, Role, SignInReason};
use super::{halt, Context};

/// A request the gate let through, with everything it looked up on the way.
pub struct Admitted {
    pub election: Election,
    pub role: Role,
    pub membership: Membership,
}

impl Admitted {
    pub fn require_commissioner(&self) -> Result<(), Response> {
        match self.role {
            Role::Commissioner => Ok(()),
            _ => Err(error::commissioner_required().into_response()),
        }
    }
}

/// Looks up the election and the caller's membership, then applies the access decision.
pub async fn admit(ctx: &Context, slug: String, caller: Caller, callback: &str) -> Result<Admitted, Response> {
    let lookup_slug = slug.clone();
    let (election, membership) = ctx.run(move |store| {
        let Some(election) = store.find_election(&lookup_slug)? else {
            return Ok((None, Membership::default()));
        };
        let membership = match caller.user_id() {
            Some(user_id) => store.membership(&election.id, user_id)?,
            None => Membership::default(),
        };
        Ok((Some(election), membership))
    }).await.map_err(halt)?;

    let role = Role::resolve(&caller, &membership);
    let decision = voting::evaluate(election.as_ref(), role, &ctx.local_now());
    debug!(%slug, ?role, ?decision, "access decision");

    match (decision, election) {
        (Decision::Allow(role), Some(election)) => Ok(Admitted { election, role, membership }),
        (Decision::SignIn(reason), _) => Err(redirect(&ctx.config, reason, callback)?),
        _ => Err(error::election_not_found().into_response()),
    }
}

pub fn sign_in_location(config: &Config, reason: SignInReason, callback: &str) -> Result<Url, url::ParseError> {
    let path = match reason {
        SignInReason::Authenticate => &config.sign_in_path,
        SignInReason::RequestVoterAccess => &config.register_path,
    };
    let mut location = config.public_url.join(path)?;
    location.query_pairs_mut().append_pair("callbackUrl", callback);
    Ok(location)
}

fn redirect(config: &Config, reason: SignInReason, callback: &str) -> Result<Response, Response> {
    let location = sign_in_location(config, reason, callback).map_err(|err| {
        tracing::error!("Cannot build sign-in location: {err}");
        HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    })?;
    let response = reply::with_status(reply::reply(), StatusCode::SEE_OTHER);
    Ok(reply::with_header(response, LOCATION, location.as_str()).into_response())
}
