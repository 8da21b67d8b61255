use serde::Serialize;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error;
use crate::voting::{
    Caller, CreateElectionSettings, Election, Role, UnvalidatedCreateElectionSettings,
    UpdateElectionSettings, WindowState,
};
use super::gate::admit;
use super::{halt, Context};

#[derive(Serialize)]
pub struct ElectionView<'a> {
    #[serde(flatten)]
    pub election: &'a Election,
    pub state: WindowState,
    pub role: Role,
    /// Only reported to the voter themselves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
}

pub async fn get(slug: String, caller: Caller, callback: String, ctx: Context) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;

    let has_voted = match admitted.membership.voter {
        Some(voter_id) => {
            let election_id = admitted.election.id;
            let voted = ctx.run(move |store| store.has_voted(&election_id, &voter_id))
                .await
                .map_err(halt)?;
            Some(voted)
        },
        None => None,
    };

    let view = ElectionView {
        election: &admitted.election,
        state: admitted.election.state(&ctx.local_now()),
        role: admitted.role,
        has_voted,
    };
    Ok(reply::json(&view).into_response())
}

pub async fn create(
    caller: Caller, settings: UnvalidatedCreateElectionSettings, ctx: Context
) -> Result<Response, Response> {
    let Caller::User(user_id) = caller else {
        return Err(error::sign_in_required().into_response());
    };

    let settings = CreateElectionSettings::try_from(settings).map_err(halt)?;
    let election = Election::new(settings, ctx.now());

    let stored = election.clone();
    let created = ctx.run(move |store| store.create_election(&stored, &user_id))
        .await
        .map_err(halt)?;
    if !created {
        return Err(error::slug_taken(&election.slug).into_response());
    }
    info!(slug = %election.slug, id = %election.id, commissioner = %user_id, "election created");

    let view = ElectionView {
        election: &election,
        state: election.state(&ctx.local_now()),
        role: Role::Commissioner,
        has_voted: None,
    };
    Ok(reply::with_status(reply::json(&view), StatusCode::CREATED).into_response())
}

pub async fn update(
    slug: String, caller: Caller, callback: String, update: UpdateElectionSettings, ctx: Context
) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;
    admitted.require_commissioner()?;

    let election = admitted.election.apply(update, ctx.now()).map_err(halt)?;

    let stored = election.clone();
    ctx.run(move |store| store.update_election(&stored)).await.map_err(halt)?;
    info!(slug = %election.slug, id = %election.id, "election updated");

    let view = ElectionView {
        election: &election,
        state: election.state(&ctx.local_now()),
        role: admitted.role,
        has_voted: None,
    };
    Ok(reply::json(&view).into_response())
}

pub async fn delete(slug: String, caller: Caller, callback: String, ctx: Context) -> Result<Response, Response> {
    let admitted = admit(&ctx, slug, caller, &callback).await?;
    admitted.require_commissioner()?;

    let election_id = admitted.election.id;
    let now = ctx.now();
    ctx.run(move |store| store.delete_election(&election_id, now)).await.map_err(halt)?;
    info!(slug = %admitted.election.slug, id = %election_id, "election deleted");

    Ok(reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response())
}
