use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;
use crate::error::{self, ValidationError};

const POSITION_NAME_LIMITS: RangeInclusive<usize> = 1..=100;
const CANDIDATE_NAME_LIMITS: RangeInclusive<usize> = 1..=100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: Id,
    pub position_id: Id,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub id: Id,
    pub election_id: Id,
    pub name: String,
    pub min_votes: i32,
    pub max_votes: i32,
    pub candidates: Vec<Candidate>,
}

impl Position {
    pub fn new(election_id: Id, CreatePosition { name, min_votes, max_votes, candidates }: CreatePosition) -> Position {
        let id = Id::new();
        Position {
            id,
            election_id,
            name,
            min_votes,
            max_votes,
            candidates: candidates.into_iter()
                .map(|name| Candidate { id: Id::new(), position_id: id, name })
                .collect(),
        }
    }

    pub fn vote_limits(&self) -> RangeInclusive<i32> {
        self.min_votes..=self.max_votes
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePosition {
    pub name: String,
    pub min_votes: i32,
    pub max_votes: i32,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnvalidatedCreatePosition {
    pub name: String,
    #[serde(default)]
    pub min_votes: i32,
    #[serde(default = "default_max_votes")]
    pub max_votes: i32,
    pub candidates: Vec<String>,
}

fn default_max_votes() -> i32 {
    1
}

impl TryFrom<UnvalidatedCreatePosition> for CreatePosition {
    type Error = ValidationError;
    fn try_from(value: UnvalidatedCreatePosition) -> Result<Self, Self::Error> {
        let UnvalidatedCreatePosition { name, min_votes, max_votes, candidates } = value;

        let name = name.trim().to_string();
        let len = name.chars().count();
        if !POSITION_NAME_LIMITS.contains(&len) {
            return Err(error::position_name_invalid_size(POSITION_NAME_LIMITS, len));
        }

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let candidate = candidate.trim().to_string();
            let len = candidate.chars().count();
            if !CANDIDATE_NAME_LIMITS.contains(&len) {
                return Err(error::candidate_name_invalid_size(CANDIDATE_NAME_LIMITS, len));
            }
            if !seen.insert(candidate.clone()) {
                return Err(error::candidate_duplicate_name(&candidate));
            }
            names.push(candidate);
        }

        let slots = i32::try_from(names.len()).unwrap_or(i32::MAX);
        if min_votes < 0 || min_votes > max_votes || max_votes < 1 || max_votes > slots {
            return Err(error::position_vote_limits_invalid(min_votes, max_votes, names.len()));
        }

        Ok(CreatePosition { name, min_votes, max_votes, candidates: names })
    }
}


#[derive(Debug, Clone, Deserialize)]
pub struct Selection {
    pub position_id: Id,
    #[serde(default)]
    pub candidate_ids: Vec<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnvalidatedBallot {
    pub selections: Vec<Selection>,
}

/// A ballot checked against its election's positions, one entry per pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub election_id: Id,
    pub voter_id: Id,
    pub picks: Vec<Pick>,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub position_id: Id,
    pub candidate_id: Id,
}

impl Ballot {
    pub fn validate(
        unvalidated: UnvalidatedBallot,
        positions: &[Position],
        election_id: Id,
        voter_id: Id,
        cast_at: DateTime<Utc>,
    ) -> Result<Ballot, ValidationError> {
        let mut by_position: HashMap<Id, Vec<Id>> = HashMap::new();
        for Selection { position_id, candidate_ids } in unvalidated.selections {
            if !positions.iter().any(|p| p.id == position_id) {
                return Err(error::ballot_unknown_position(&position_id.0));
            }
            if by_position.insert(position_id, candidate_ids).is_some() {
                return Err(error::ballot_duplicate_position(&position_id.0));
            }
        }

        let mut picks = vec![];
        for position in positions {
            let chosen = by_position.remove(&position.id).unwrap_or_default();

            let mut seen = HashSet::new();
            for candidate_id in &chosen {
                if !position.candidates.iter().any(|c| c.id == *candidate_id) {
                    return Err(error::ballot_invalid_selection(&position.id.0, &candidate_id.0));
                }
                if !seen.insert(*candidate_id) {
                    return Err(error::ballot_duplicate_selection(&position.id.0, &candidate_id.0));
                }
            }

            let count = chosen.len();
            let within_limits = i32::try_from(count)
                .map(|c| position.vote_limits().contains(&c))
                .unwrap_or(false);
            if !within_limits {
                return Err(error::ballot_selection_count(&position.id.0, position.vote_limits(), count));
            }

            picks.extend(chosen.into_iter().map(|candidate_id| Pick { position_id: position.id, candidate_id }));
        }

        // nothing recorded would leave the voter looking like they never voted
        if picks.is_empty() {
            return Err(error::ballot_empty());
        }

        Ok(Ballot { election_id, voter_id, picks, cast_at })
    }
}

impl Display for Ballot {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({} in {}: {} picks)", self.voter_id, self.election_id, self.picks.len())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOutcome {
    Recorded,
    AlreadyVoted,
}
