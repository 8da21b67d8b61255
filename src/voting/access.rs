//! Per-request access classification for an election's namespace.
//!
//! The gate only classifies. Turning a [`Decision`] into a page, a redirect
//! or a not-found response is the caller's job, and so is every lookup that
//! feeds it. A private election a caller may not see is indistinguishable
//! from one that does not exist.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use super::election::{Election, Publicity};
use super::id::Id;

/// Identity of whoever is making the request, as reported by the session layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(Id),
}

impl Caller {
    pub fn user_id(&self) -> Option<&Id> {
        match self {
            Caller::Anonymous => None,
            Caller::User(id) => Some(id),
        }
    }
}

/// Rows linking a user to one election.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Membership {
    pub commissioner: bool,
    pub voter: Option<Id>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    NonMember,
    Voter,
    Commissioner,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Role; 4] = [Role::Anonymous, Role::NonMember, Role::Voter, Role::Commissioner];

    pub fn resolve(caller: &Caller, membership: &Membership) -> Role {
        match caller {
            Caller::Anonymous => Role::Anonymous,
            Caller::User(_) if membership.commissioner => Role::Commissioner,
            Caller::User(_) if membership.voter.is_some() => Role::Voter,
            Caller::User(_) => Role::NonMember,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignInReason {
    /// Caller has no session yet.
    Authenticate,
    /// Caller is signed in but must be added as a voter first.
    RequestVoterAccess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow(Role),
    NotFound,
    SignIn(SignInReason),
}

/// The decision table, evaluated once the election is known to exist.
pub fn evaluate_access(publicity: Publicity, role: Role, is_ongoing: bool) -> Decision {
    match (publicity, role) {
        (Publicity::Private, Role::Commissioner) => Decision::Allow(role),
        // never prompt for sign-in here, it would confirm the election exists
        (Publicity::Private, _) => Decision::NotFound,

        (Publicity::Voter, Role::Anonymous) => Decision::SignIn(SignInReason::Authenticate),
        (Publicity::Voter, Role::Commissioner | Role::Voter) => Decision::Allow(role),
        (Publicity::Voter, Role::NonMember) if is_ongoing => {
            Decision::SignIn(SignInReason::RequestVoterAccess)
        },
        (Publicity::Voter, Role::NonMember) => Decision::NotFound,

        (Publicity::Public, _) => Decision::Allow(role),
    }
}

pub fn evaluate<Tz: TimeZone>(election: Option<&Election>, role: Role, now: &DateTime<Tz>) -> Decision {
    match election {
        None => Decision::NotFound,
        Some(election) if election.is_deleted() => Decision::NotFound,
        Some(election) => evaluate_access(election.publicity, role, election.is_ongoing(now)),
    }
}
