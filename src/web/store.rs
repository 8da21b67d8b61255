use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::voting::{Ballot, CastOutcome, Election, Id, Membership, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveVoterOutcome {
    Removed,
    NotAVoter,
    HasVoted,
}

/// Everything the HTTP layer reads or writes. Implementations block, so
/// callers run them off the async executor.
pub trait Store: Send + Sync {
    /// Soft-deleted elections are never returned.
    fn find_election(&self, slug: &str) -> Result<Option<Election>, StoreError>;

    fn membership(&self, election_id: &Id, user_id: &Id) -> Result<Membership, StoreError>;

    fn has_voted(&self, election_id: &Id, voter_id: &Id) -> Result<bool, StoreError>;

    /// Returns false when the slug belongs to another election, deleted ones included.
    fn create_election(&self, election: &Election, commissioner: &Id) -> Result<bool, StoreError>;

    fn update_election(&self, election: &Election) -> Result<(), StoreError>;

    fn delete_election(&self, election_id: &Id, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns the new voter id, or None when the user already is one.
    fn add_voter(&self, election_id: &Id, user_id: &Id) -> Result<Option<Id>, StoreError>;

    fn remove_voter(&self, election_id: &Id, user_id: &Id) -> Result<RemoveVoterOutcome, StoreError>;

    fn positions(&self, election_id: &Id) -> Result<Vec<Position>, StoreError>;

    fn add_position(&self, position: &Position) -> Result<(), StoreError>;

    /// Records every pick of the ballot, unless the voter already has a vote
    /// in this election.
    fn cast_ballot(&self, ballot: &Ballot) -> Result<CastOutcome, StoreError>;
}
