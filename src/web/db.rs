pub mod models;
pub mod schema;

use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::Error as DbError;
use diesel::PgConnection;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::voting::{self, Ballot, CastOutcome, Id, Membership};
use super::store::{RemoveVoterOutcome, Store};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pool(config: &Config) -> Result<PgPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let pool = Pool::builder()
        .max_size(config.database_pool_size)
        .build(manager)?;
    Ok(pool)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn voter_has_votes(conn: &mut PgConnection, voter_id: &Uuid, election_id: &Uuid) -> Result<bool, DbError> {
    diesel::select(exists(
        schema::votes::table.filter(
            schema::votes::voter_id.eq(*voter_id).and(schema::votes::election_id.eq(*election_id))
        )
    )).get_result(conn)
}

impl Store for PgStore {
    fn find_election(&self, slug: &str) -> Result<Option<voting::Election>, StoreError> {
        let conn = &mut self.pool.get()?;
        let row = schema::elections::table
            .filter(schema::elections::slug.eq(slug))
            .filter(schema::elections::deleted_at.is_null())
            .select(models::Election::as_select())
            .first(conn)
            .optional()?;

        row.map(voting::Election::try_from).transpose()
    }

    fn membership(&self, election_id: &Id, user_id: &Id) -> Result<Membership, StoreError> {
        let conn = &mut self.pool.get()?;
        let commissioner: bool = diesel::select(exists(
            schema::commissioners::table.filter(
                schema::commissioners::election_id.eq(election_id.0)
                    .and(schema::commissioners::user_id.eq(user_id.0))
            )
        )).get_result(conn)?;

        let voter: Option<Uuid> = schema::voters::table
            .filter(schema::voters::election_id.eq(election_id.0).and(schema::voters::user_id.eq(user_id.0)))
            .select(schema::voters::id)
            .first(conn)
            .optional()?;

        Ok(Membership { commissioner, voter: voter.map(Id) })
    }

    fn has_voted(&self, election_id: &Id, voter_id: &Id) -> Result<bool, StoreError> {
        let conn = &mut self.pool.get()?;
        Ok(voter_has_votes(conn, &voter_id.0, &election_id.0)?)
    }

    fn create_election(&self, election: &voting::Election, commissioner: &Id) -> Result<bool, StoreError> {
        let conn = &mut self.pool.get()?;
        let created = conn.transaction::<_, DbError, _>(|conn| {
            // slugs of soft-deleted elections stay reserved through the unique index
            let inserted = diesel::insert_into(schema::elections::table)
                .values(models::NewElection::from(election))
                .on_conflict_do_nothing()
                .execute(conn)?;
            if inserted == 0 {
                return Ok(false);
            }

            diesel::insert_into(schema::commissioners::table)
                .values(models::NewCommissioner {
                    id: Uuid::new_v4(),
                    election_id: election.id.0,
                    user_id: commissioner.0,
                    created_at: election.created_at.naive_utc(),
                })
                .execute(conn)?;
            Ok(true)
        })?;
        Ok(created)
    }

    fn update_election(&self, election: &voting::Election) -> Result<(), StoreError> {
        let conn = &mut self.pool.get()?;
        diesel::update(schema::elections::table.find(election.id.0))
            .set(models::UpdateElection::from(election))
            .execute(conn)?;
        Ok(())
    }

    fn delete_election(&self, election_id: &Id, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = &mut self.pool.get()?;
        diesel::update(schema::elections::table.find(election_id.0))
            .set(schema::elections::deleted_at.eq(Some(at.naive_utc())))
            .execute(conn)?;
        Ok(())
    }

    fn add_voter(&self, election_id: &Id, user_id: &Id) -> Result<Option<Id>, StoreError> {
        let conn = &mut self.pool.get()?;
        let id = Uuid::new_v4();
        let inserted = diesel::insert_into(schema::voters::table)
            .values(models::NewVoter {
                id,
                election_id: election_id.0,
                user_id: user_id.0,
                created_at: Utc::now().naive_utc(),
            })
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok((inserted > 0).then_some(Id(id)))
    }

    fn remove_voter(&self, election_id: &Id, user_id: &Id) -> Result<RemoveVoterOutcome, StoreError> {
        let conn = &mut self.pool.get()?;
        let outcome = conn.transaction::<_, DbError, _>(|conn| {
            let voter_id: Option<Uuid> = schema::voters::table
                .filter(schema::voters::election_id.eq(election_id.0).and(schema::voters::user_id.eq(user_id.0)))
                .select(schema::voters::id)
                .for_update()
                .first(conn)
                .optional()?;

            let Some(voter_id) = voter_id else {
                return Ok(RemoveVoterOutcome::NotAVoter);
            };
            if voter_has_votes(conn, &voter_id, &election_id.0)? {
                return Ok(RemoveVoterOutcome::HasVoted);
            }

            diesel::delete(schema::voters::table.find(voter_id)).execute(conn)?;
            Ok(RemoveVoterOutcome::Removed)
        })?;
        Ok(outcome)
    }

    fn positions(&self, election_id: &Id) -> Result<Vec<voting::Position>, StoreError> {
        let conn = &mut self.pool.get()?;
        let positions: Vec<models::Position> = schema::positions::table
            .filter(schema::positions::election_id.eq(election_id.0))
            .order(schema::positions::sort_order)
            .select(models::Position::as_select())
            .load(conn)?;

        let candidates: Vec<models::Candidate> = models::Candidate::belonging_to(&positions)
            .order(schema::candidates::name)
            .select(models::Candidate::as_select())
            .load(conn)?;

        Ok(candidates.grouped_by(&positions)
            .into_iter()
            .zip(positions)
            .map(|(candidates, position)| {
                position.into_voting(candidates.into_iter().map(voting::Candidate::from).collect())
            })
            .collect())
    }

    fn add_position(&self, position: &voting::Position) -> Result<(), StoreError> {
        let conn = &mut self.pool.get()?;
        conn.transaction::<_, DbError, _>(|conn| {
            let existing: i64 = schema::positions::table
                .filter(schema::positions::election_id.eq(position.election_id.0))
                .count()
                .get_result(conn)?;
            let sort_order = i32::try_from(existing).unwrap_or(i32::MAX);

            diesel::insert_into(schema::positions::table)
                .values(models::Position::from(position, sort_order))
                .execute(conn)?;
            diesel::insert_into(schema::candidates::table)
                .values(position.candidates.iter().map(models::Candidate::from).collect::<Vec<_>>())
                .execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn cast_ballot(&self, ballot: &Ballot) -> Result<CastOutcome, StoreError> {
        let conn = &mut self.pool.get()?;
        let outcome = conn.transaction::<_, DbError, _>(|conn| {
            // serialises concurrent submissions by the same voter
            schema::voters::table
                .find(ballot.voter_id.0)
                .select(schema::voters::id)
                .for_update()
                .first::<Uuid>(conn)?;

            if voter_has_votes(conn, &ballot.voter_id.0, &ballot.election_id.0)? {
                return Ok(CastOutcome::AlreadyVoted);
            }

            diesel::insert_into(schema::votes::table)
                .values(models::NewVote::from_ballot(ballot))
                .execute(conn)?;
            Ok(CastOutcome::Recorded)
        })?;
        Ok(outcome)
    }
}
