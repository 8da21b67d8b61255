use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use diesel::result::Error as DbError;
use thiserror::Error;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

impl StdError for ValidationError {}

pub fn election_name_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("election's name must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn election_slug_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("election's slug must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn election_slug_invalid_format(slug: &str) -> ValidationError {
    ValidationError {
        message: format!("election's slug may only contain lowercase letters, digits and inner dashes, got {slug:?}"),
    }
}

pub fn election_window_inverted(start: &NaiveDate, end: &NaiveDate) -> ValidationError {
    ValidationError {
        message: format!("election cannot end before it starts, starts {start} and ends {end}"),
    }
}

pub fn publicity_unknown(value: &str) -> ValidationError {
    ValidationError {
        message: format!("publicity must be one of PRIVATE, VOTER or PUBLIC, got {value:?}"),
    }
}

pub fn position_name_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("position's name must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn position_vote_limits_invalid(min: i32, max: i32, candidates: usize) -> ValidationError {
    ValidationError {
        message: format!(
            "position must allow between 0 <= min <= max, 1 <= max <= {candidates} selections, got {min}..={max}"
        ),
    }
}

pub fn candidate_name_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("candidate's name must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn candidate_duplicate_name(name: &str) -> ValidationError {
    ValidationError {
        message: format!("position lists candidate {name:?} more than once"),
    }
}

pub fn ballot_empty() -> ValidationError {
    ValidationError {
        message: "ballot is empty".to_string(),
    }
}

pub fn ballot_unknown_position(position_id: &Uuid) -> ValidationError {
    ValidationError {
        message: format!("ballot selects for position {position_id}, which is not part of this election"),
    }
}

pub fn ballot_duplicate_position(position_id: &Uuid) -> ValidationError {
    ValidationError {
        message: format!("ballot lists position {position_id} more than once"),
    }
}

pub fn ballot_invalid_selection(position_id: &Uuid, candidate_id: &Uuid) -> ValidationError {
    ValidationError {
        message: format!("ballot selects candidate {candidate_id}, who is not running for position {position_id}"),
    }
}

pub fn ballot_duplicate_selection(position_id: &Uuid, candidate_id: &Uuid) -> ValidationError {
    ValidationError {
        message: format!("ballot selects candidate {candidate_id} more than once for position {position_id}"),
    }
}

pub fn ballot_selection_count(position_id: &Uuid, limits: RangeInclusive<i32>, count: usize) -> ValidationError {
    ValidationError {
        message: format!("position {position_id} takes between {} and {} selections, got {count}",
            limits.start(), limits.end()
        ),
    }
}

pub fn malformed_row(table: &str, id: &Uuid, source: ValidationError) -> StoreError {
    StoreError::MalformedRow { table: table.to_string(), id: *id, source }
}


/// Faults raised by the backing store. None of these are domain outcomes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not check out a database connection: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database query failed: {0}")]
    Query(#[from] DbError),

    #[error("row {id} of {table} is malformed: {source}")]
    MalformedRow {
        table: String,
        id: Uuid,
        source: ValidationError,
    },

    #[error("blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("environment variable {key} is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}


#[derive(Debug)]
pub struct HttpError {
    pub code: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        HttpError { code, message: message.into() }
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl StdError for HttpError { }

impl From<ValidationError> for HttpError {
    fn from(value: ValidationError) -> Self {
        HttpError {
            message: value.to_string(),
            code: StatusCode::BAD_REQUEST,
        }
    }
}

impl From<StoreError> for HttpError {
    fn from(value: StoreError) -> Self {
        tracing::error!(error = %value, "store failure");
        HttpError {
            message: "Internal server error".to_string(),
            code: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reply for HttpError {
    fn into_response(self) -> Response {
        let body = reply::json(&serde_json::json!({ "error": self.message }));
        reply::with_status(body, self.code).into_response()
    }
}

/// Identical for missing, soft-deleted and hidden elections.
pub fn election_not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Election not found")
}

pub fn sign_in_required() -> HttpError {
    HttpError::new(StatusCode::UNAUTHORIZED, "Sign in required")
}

pub fn commissioner_required() -> HttpError {
    HttpError::new(StatusCode::FORBIDDEN, "Only commissioners of this election may do that")
}

pub fn voter_required() -> HttpError {
    HttpError::new(StatusCode::FORBIDDEN, "Only voters of this election may cast a ballot")
}

pub fn voting_not_open() -> HttpError {
    HttpError::new(StatusCode::FORBIDDEN, "Voting has not opened for this election yet")
}

pub fn voting_ended() -> HttpError {
    HttpError::new(StatusCode::FORBIDDEN, "Voting has ended for this election")
}

pub fn election_started() -> HttpError {
    HttpError::new(StatusCode::CONFLICT, "Positions cannot change once voting has started")
}

pub fn slug_taken(slug: &str) -> HttpError {
    HttpError::new(StatusCode::CONFLICT, format!("Slug {slug:?} is already in use"))
}

pub fn already_voter(user_id: &Uuid) -> HttpError {
    HttpError::new(StatusCode::CONFLICT, format!("User {user_id} is already a voter"))
}

pub fn voter_not_found(user_id: &Uuid) -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, format!("User {user_id} is not a voter"))
}

pub fn voter_has_voted(user_id: &Uuid) -> HttpError {
    HttpError::new(StatusCode::CONFLICT, format!("User {user_id} has already cast a ballot and cannot be removed"))
}

pub fn already_voted() -> HttpError {
    HttpError::new(StatusCode::CONFLICT, "A ballot has already been cast")
}
