mod access;
mod ballot;
mod election;
mod id;
mod window;

pub use access::{evaluate, Caller, Decision, Membership, Role, SignInReason};
pub use ballot::{
    Ballot, Candidate, CastOutcome, CreatePosition, Position, UnvalidatedBallot,
    UnvalidatedCreatePosition,
};
pub use election::{
    CreateElectionSettings, Election, UnvalidatedCreateElectionSettings, UpdateElectionSettings,
};
pub use id::Id;
pub use window::{ElectionWindow, EndComparison, WindowState};

#[cfg(test)]
pub use ballot::Pick;
#[cfg(test)]
pub use election::Publicity;
