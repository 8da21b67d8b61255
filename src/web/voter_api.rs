use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error;
use crate::voting::{Caller, Id};
use super::gate::admit;
use super::store::RemoveVoterOutcome;
use super::{halt, Context};

#[derive(Debug, Deserialize)]
pub struct AddVoter {
    pub user_id: Id,
}

#[derive(Debug, Serialize)]
pub struct VoterAdded {
    pub voter_id: Id,
    pub user_id: Id,
}

pub async fn add(
    slug: String, caller: Caller, callback: String, AddVoter { user_id }: AddVoter, ctx: Context
) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;
    admitted.require_commissioner()?;

    let election_id = admitted.election.id;
    let voter_id = ctx.run(move |store| store.add_voter(&election_id, &user_id))
        .await
        .map_err(halt)?
        .ok_or_else(|| error::already_voter(&user_id.0).into_response())?;
    info!(slug = %admitted.election.slug, user = %user_id, voter = %voter_id, "voter added");

    let body = reply::json(&VoterAdded { voter_id, user_id });
    Ok(reply::with_status(body, StatusCode::CREATED).into_response())
}

pub async fn remove(
    slug: String, user_id: Uuid, caller: Caller, callback: String, ctx: Context
) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;
    admitted.require_commissioner()?;

    let election_id = admitted.election.id;
    let outcome = ctx.run(move |store| store.remove_voter(&election_id, &Id(user_id)))
        .await
        .map_err(halt)?;

    match outcome {
        RemoveVoterOutcome::Removed => {
            info!(slug = %admitted.election.slug, user = %user_id, "voter removed");
            Ok(reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response())
        },
        RemoveVoterOutcome::NotAVoter => Err(error::voter_not_found(&user_id).into_response()),
        RemoveVoterOutcome::HasVoted => Err(error::voter_has_voted(&user_id).into_response()),
    }
}
