use std::convert::TryFrom;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::voting;
use crate::error::{self, StoreError};
use super::schema;

#[derive(Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::elections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Election {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub publicity: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl TryFrom<Election> for voting::Election {
    type Error = StoreError;
    fn try_from(row: Election) -> Result<Self, Self::Error> {
        let Election {
            id,
            slug,
            name,
            start_date,
            end_date,
            publicity,
            created_at,
            updated_at,
            deleted_at,
        } = row;

        // rows written outside this service may not honour the checks made at creation
        let window = voting::ElectionWindow::new(start_date, end_date)
            .map_err(|e| error::malformed_row("elections", &id, e))?;
        let publicity = publicity.parse()
            .map_err(|e| error::malformed_row("elections", &id, e))?;

        Ok(voting::Election {
            id: voting::Id(id),
            slug,
            name,
            window,
            publicity,
            created_at: created_at.and_utc(),
            updated_at: updated_at.and_utc(),
            deleted_at: deleted_at.map(|t| t.and_utc()),
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::elections)]
pub struct NewElection<'a> {
    pub id: Uuid,
    pub slug: &'a str,
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub publicity: &'static str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'a> From<&'a voting::Election> for NewElection<'a> {
    fn from(election: &'a voting::Election) -> Self {
        Self {
            id: election.id.0,
            slug: &election.slug,
            name: &election.name,
            start_date: election.window.start(),
            end_date: election.window.end(),
            publicity: election.publicity.as_str(),
            created_at: election.created_at.naive_utc(),
            updated_at: election.updated_at.naive_utc(),
        }
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = schema::elections)]
pub struct UpdateElection<'a> {
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub publicity: &'static str,
    pub updated_at: NaiveDateTime,
}

impl<'a> From<&'a voting::Election> for UpdateElection<'a> {
    fn from(election: &'a voting::Election) -> Self {
        Self {
            name: &election.name,
            start_date: election.window.start(),
            end_date: election.window.end(),
            publicity: election.publicity.as_str(),
            updated_at: election.updated_at.naive_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::commissioners)]
pub struct NewCommissioner {
    pub id: Uuid,
    pub election_id: Uuid,
    pub user_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = schema::voters)]
pub struct NewVoter {
    pub id: Uuid,
    pub election_id: Uuid,
    pub user_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Identifiable, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::positions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Position {
    pub id: Uuid,
    pub election_id: Uuid,
    pub name: String,
    pub min_votes: i32,
    pub max_votes: i32,
    pub sort_order: i32,
}

impl Position {
    pub fn from(position: &voting::Position, sort_order: i32) -> Self {
        Self {
            id: position.id.0,
            election_id: position.election_id.0,
            name: position.name.clone(),
            min_votes: position.min_votes,
            max_votes: position.max_votes,
            sort_order,
        }
    }

    pub fn into_voting(self, candidates: Vec<voting::Candidate>) -> voting::Position {
        voting::Position {
            id: voting::Id(self.id),
            election_id: voting::Id(self.election_id),
            name: self.name,
            min_votes: self.min_votes,
            max_votes: self.max_votes,
            candidates,
        }
    }
}

#[derive(Debug, Associations, Identifiable, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::candidates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Position, foreign_key = position_id))]
pub struct Candidate {
    pub id: Uuid,
    pub position_id: Uuid,
    pub name: String,
}

impl From<&voting::Candidate> for Candidate {
    fn from(candidate: &voting::Candidate) -> Self {
        Self {
            id: candidate.id.0,
            position_id: candidate.position_id.0,
            name: candidate.name.clone(),
        }
    }
}

impl From<Candidate> for voting::Candidate {
    fn from(row: Candidate) -> Self {
        voting::Candidate {
            id: voting::Id(row.id),
            position_id: voting::Id(row.position_id),
            name: row.name,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::votes)]
pub struct NewVote {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub created_at: NaiveDateTime,
}

impl NewVote {
    pub fn from_ballot(ballot: &voting::Ballot) -> Vec<Self> {
        ballot.picks.iter()
            .map(|pick| NewVote {
                id: Uuid::new_v4(),
                voter_id: ballot.voter_id.0,
                election_id: ballot.election_id.0,
                candidate_id: pick.candidate_id.0,
                created_at: ballot.cast_at.naive_utc(),
            })
            .collect()
    }
}
