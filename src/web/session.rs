use std::convert::Infallible;

use tracing::warn;
use uuid::Uuid;
use warp::http::{HeaderMap, HeaderValue};
use warp::Filter;

use crate::voting::{Caller, Id};

/// Set by the identity provider in front of this service once a session is established.
pub const USER_HEADER: &str = "x-user-id";

/// Never rejects: a header that is absent or cannot be read makes the caller anonymous.
pub fn caller() -> impl Filter<Extract = (Caller,), Error = Infallible> + Clone {
    warp::header::headers_cloned().map(|headers: HeaderMap| parse_caller(headers.get(USER_HEADER)))
}

fn parse_caller(header: Option<&HeaderValue>) -> Caller {
    let Some(value) = header else {
        return Caller::Anonymous;
    };
    let Ok(raw) = value.to_str() else {
        warn!("Ignoring {USER_HEADER} header with non-ASCII bytes {value:?}");
        return Caller::Anonymous;
    };
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Caller::User(Id(id)),
        Err(err) => {
            warn!("Ignoring unparsable {USER_HEADER} header {raw:?}: {err}");
            Caller::Anonymous
        },
    }
}
