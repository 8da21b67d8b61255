use tracing::info;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error;
use crate::voting::{
    Ballot, Caller, CastOutcome, CreatePosition, EndComparison, Position, UnvalidatedBallot, UnvalidatedCreatePosition,
    WindowState,
};
use super::gate::admit;
use super::{halt, Context};

pub async fn positions(slug: String, caller: Caller, callback: String, ctx: Context) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;

    let election_id = admitted.election.id;
    let positions = ctx.run(move |store| store.positions(&election_id)).await.map_err(halt)?;

    Ok(reply::json(&positions).into_response())
}

pub async fn add_position(
    slug: String, caller: Caller, callback: String, position: UnvalidatedCreatePosition, ctx: Context
) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;
    admitted.require_commissioner()?;

    if admitted.election.state(&ctx.local_now()) != WindowState::Upcoming {
        return Err(error::election_started().into_response());
    }

    let position = CreatePosition::try_from(position).map_err(halt)?;
    let position = Position::new(admitted.election.id, position);

    let stored = position.clone();
    ctx.run(move |store| store.add_position(&stored)).await.map_err(halt)?;
    info!(slug = %admitted.election.slug, position = %position.id, "position added");

    Ok(reply::with_status(reply::json(&position), StatusCode::CREATED).into_response())
}

pub async fn cast(
    slug: String, caller: Caller, callback: String, ballot: UnvalidatedBallot, ctx: Context
) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;

    // commissioners who are also voters resolve to the commissioner role
    let Some(voter_id) = admitted.membership.voter else {
        return Err(error::voter_required().into_response());
    };
    let local_now = ctx.local_now();
    if admitted.election.is_ended(&local_now, EndComparison::Timestamp) {
        return Err(error::voting_ended().into_response());
    }
    if !admitted.election.is_ongoing(&local_now) {
        return Err(error::voting_not_open().into_response());
    }

    let election_id = admitted.election.id;
    let positions = ctx.run(move |store| store.positions(&election_id)).await.map_err(halt)?;
    let ballot = Ballot::validate(ballot, &positions, election_id, voter_id, ctx.now()).map_err(halt)?;

    let summary = ballot.to_string();
    let outcome = ctx.run(move |store| store.cast_ballot(&ballot)).await.map_err(halt)?;
    match outcome {
        CastOutcome::Recorded => {
            info!(slug = %admitted.election.slug, "ballot recorded {summary}");
            Ok(reply::with_status(reply::reply(), StatusCode::CREATED).into_response())
        },
        CastOutcome::AlreadyVoted => Err(error::already_voted().into_response()),
    }
}
