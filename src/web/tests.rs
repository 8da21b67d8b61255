use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;

use super::store::memory::MemoryStore;
use super::store::Store;
use super::*;
use crate::clock::FixedClock;
use crate::voting::{CreateElectionSettings, CreatePosition, Election, ElectionWindow, Id, Position, Publicity};

fn config() -> Config {
    let vars: HashMap<&str, &str> = [
        ("DATABASE_URL", "postgres://localhost/elections"),
        ("PUBLIC_URL", "https://vote.example.org"),
    ].into_iter().collect();
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn context(store: &Arc<MemoryStore>, now: DateTime<Utc>) -> Context {
    Context::new(store.clone(), Arc::new(config()), Arc::new(FixedClock(now)))
}

fn election(slug: &str, publicity: Publicity, start: (i32, u32, u32), end: (i32, u32, u32)) -> Election {
    let window = ElectionWindow::new(
        NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
    ).unwrap();
    Election::new(CreateElectionSettings {
        slug: slug.to_string(),
        name: format!("Election {slug}"),
        window,
        publicity,
    }, at(2023, 12, 1, 0))
}

/// An election running 2024-01-01..=2024-01-03 with one commissioner and one voter.
struct Fixture {
    store: Arc<MemoryStore>,
    election: Election,
    commissioner: Id,
    voter: Id,
}

fn fixture(publicity: Publicity) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let election = election("council-2024", publicity, (2024, 1, 1), (2024, 1, 3));
    let commissioner = Id::new();
    let voter = Id::new();
    store.insert_election(election.clone(), Some(commissioner));
    store.add_voter(&election.id, &voter).unwrap();
    Fixture { store, election, commissioner, voter }
}

async fn send(
    ctx: Context, method: &str, path: &str, user: Option<&Id>, body: Option<Value>
) -> warp::http::Response<Bytes> {
    let mut request = warp::test::request().method(method).path(path);
    if let Some(user) = user {
        request = request.header(session::USER_HEADER, user.to_string());
    }
    if let Some(body) = body {
        request = request.json(&body);
    }
    request.reply(&routes(ctx)).await
}

fn body_json(response: &warp::http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn location(response: &warp::http::Response<Bytes>) -> String {
    response.headers().get("location").unwrap().to_str().unwrap().to_string()
}

#[tokio::test]
async fn hidden_private_election_looks_like_missing_one() {
    let f = fixture(Publicity::Private);
    let ctx = context(&f.store, at(2024, 1, 1, 12));

    let hidden = send(ctx.clone(), "GET", "/api/election/council-2024", None, None).await;
    let missing = send(ctx.clone(), "GET", "/api/election/no-such-election", None, None).await;
    let as_voter = send(ctx.clone(), "GET", "/api/election/council-2024", Some(&f.voter), None).await;

    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(as_voter.status(), StatusCode::NOT_FOUND);
    assert_eq!(hidden.body(), missing.body());
    assert_eq!(as_voter.body(), missing.body());
    assert!(hidden.headers().get("location").is_none());

    let as_commissioner = send(ctx, "GET", "/api/election/council-2024", Some(&f.commissioner), None).await;
    assert_eq!(as_commissioner.status(), StatusCode::OK);
    assert_eq!(body_json(&as_commissioner)["role"], "commissioner");
}

#[tokio::test]
async fn voter_election_redirects_anonymous_to_sign_in() {
    let f = fixture(Publicity::Voter);
    let ctx = context(&f.store, at(2024, 1, 2, 0));

    let response = send(ctx, "GET", "/api/election/council-2024", None, None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://vote.example.org/sign-in?callbackUrl=%2Fapi%2Felection%2Fcouncil-2024"
    );
}

#[tokio::test]
async fn voter_election_non_member() {
    let f = fixture(Publicity::Voter);
    let stranger = Id::new();

    for now in [at(2023, 12, 31, 23), at(2024, 1, 4, 0)] {
        let response = send(context(&f.store, now), "GET", "/api/election/council-2024", Some(&stranger), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "at {now}");
    }

    let during = send(context(&f.store, at(2024, 1, 3, 23)), "GET", "/api/election/council-2024", Some(&stranger), None).await;
    assert_eq!(during.status(), StatusCode::SEE_OTHER);
    assert!(location(&during).starts_with("https://vote.example.org/register?callbackUrl="));
}

#[tokio::test]
async fn voter_sees_state_and_vote_status() {
    let f = fixture(Publicity::Voter);
    let response = send(context(&f.store, at(2024, 1, 2, 9)), "GET", "/api/election/council-2024", Some(&f.voter), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(&response);
    assert_eq!(body["slug"], "council-2024");
    assert_eq!(body["publicity"], "VOTER");
    assert_eq!(body["state"], "ONGOING");
    assert_eq!(body["role"], "voter");
    assert_eq!(body["has_voted"], false);
}

#[tokio::test]
async fn public_election_allows_anyone_any_time() {
    let f = fixture(Publicity::Public);
    for now in [at(2020, 1, 1, 0), at(2024, 1, 2, 0), at(2030, 1, 1, 0)] {
        let response = send(context(&f.store, now), "GET", "/api/election/council-2024", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(&response);
        assert_eq!(body["role"], "anonymous");
        assert!(body.get("has_voted").is_none());
    }
}

#[tokio::test]
async fn commissioner_of_another_election_gets_not_found() {
    let f = fixture(Publicity::Private);
    let other = election("other-2024", Publicity::Private, (2024, 1, 1), (2024, 1, 3));
    let other_commissioner = Id::new();
    f.store.insert_election(other, Some(other_commissioner));

    let ctx = context(&f.store, at(2024, 1, 2, 0));
    let response = send(ctx.clone(), "GET", "/api/election/council-2024", Some(&other_commissioner), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let own = send(ctx, "GET", "/api/election/other-2024", Some(&other_commissioner), None).await;
    assert_eq!(own.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_and_soft_delete() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(&store, at(2024, 5, 1, 0));
    let creator = Id::new();
    let settings = json!({
        "slug": "board-2024",
        "name": "Board Election",
        "start_date": "2024-06-01",
        "end_date": "2024-06-02",
        "publicity": "PRIVATE",
    });

    let anonymous = send(ctx.clone(), "POST", "/api/election", None, Some(settings.clone())).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let created = send(ctx.clone(), "POST", "/api/election", Some(&creator), Some(settings.clone())).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_json(&created)["state"], "UPCOMING");

    let again = send(ctx.clone(), "POST", "/api/election", Some(&Id::new()), Some(settings)).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let fetched = send(ctx.clone(), "GET", "/api/election/board-2024", Some(&creator), None).await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let deleted = send(ctx.clone(), "DELETE", "/api/election/board-2024", Some(&creator), None).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = send(ctx.clone(), "GET", "/api/election/board-2024", Some(&creator), None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    // slugs of deleted elections stay reserved
    let reuse = send(ctx, "POST", "/api/election", Some(&creator), Some(json!({
        "slug": "board-2024",
        "name": "Board Election",
        "start_date": "2024-06-01",
        "end_date": "2024-06-02",
        "publicity": "PUBLIC",
    }))).await;
    assert_eq!(reuse.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_rejects_bad_settings() {
    let store = Arc::new(MemoryStore::new());
    let ctx = context(&store, at(2024, 5, 1, 0));
    let creator = Id::new();

    for settings in [
        json!({"slug": "bad-dates", "name": "x", "start_date": "2024-06-03", "end_date": "2024-06-02", "publicity": "PUBLIC"}),
        json!({"slug": "bad-publicity", "name": "x", "start_date": "2024-06-01", "end_date": "2024-06-02", "publicity": "OPEN"}),
        json!({"slug": "Bad Slug", "name": "x", "start_date": "2024-06-01", "end_date": "2024-06-02", "publicity": "PUBLIC"}),
        json!({"slug": "missing-dates", "name": "x", "publicity": "PUBLIC"}),
    ] {
        let response = send(ctx.clone(), "POST", "/api/election", Some(&creator), Some(settings.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{settings}");
    }
}

#[tokio::test]
async fn only_commissioners_update() {
    let f = fixture(Publicity::Voter);
    let ctx = context(&f.store, at(2024, 1, 2, 0));
    let update = json!({ "publicity": "PUBLIC", "end_date": "2024-01-05" });

    let by_voter = send(ctx.clone(), "PATCH", "/api/election/council-2024", Some(&f.voter), Some(update.clone())).await;
    assert_eq!(by_voter.status(), StatusCode::FORBIDDEN);

    let inverted = json!({ "end_date": "2023-12-31" });
    let rejected = send(ctx.clone(), "PATCH", "/api/election/council-2024", Some(&f.commissioner), Some(inverted)).await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let updated = send(ctx, "PATCH", "/api/election/council-2024", Some(&f.commissioner), Some(update)).await;
    assert_eq!(updated.status(), StatusCode::OK);
    let stored = f.store.election(&f.election.id).unwrap();
    assert_eq!(stored.publicity, Publicity::Public);
    assert_eq!(stored.window.end(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
}

#[tokio::test]
async fn voters_are_managed_by_commissioners() {
    let f = fixture(Publicity::Voter);
    let ctx = context(&f.store, at(2023, 12, 20, 0));
    let newcomer = Id::new();
    let path = format!("/api/election/council-2024/voters/{newcomer}");

    let by_voter = send(ctx.clone(), "POST", "/api/election/council-2024/voters", Some(&f.voter), Some(json!({ "user_id": newcomer }))).await;
    assert_eq!(by_voter.status(), StatusCode::FORBIDDEN);

    let added = send(ctx.clone(), "POST", "/api/election/council-2024/voters", Some(&f.commissioner), Some(json!({ "user_id": newcomer }))).await;
    assert_eq!(added.status(), StatusCode::CREATED);
    assert_eq!(body_json(&added)["user_id"], newcomer.to_string());

    let twice = send(ctx.clone(), "POST", "/api/election/council-2024/voters", Some(&f.commissioner), Some(json!({ "user_id": newcomer }))).await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);

    let removed = send(ctx.clone(), "DELETE", &path, Some(&f.commissioner), None).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let missing = send(ctx, "DELETE", &path, Some(&f.commissioner), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

fn add_president(f: &Fixture) -> Position {
    let position = Position::new(f.election.id, CreatePosition {
        name: "President".to_string(),
        min_votes: 1,
        max_votes: 1,
        candidates: vec!["Alice".to_string(), "Bob".to_string()],
    });
    f.store.add_position(&position).unwrap();
    position
}

#[tokio::test]
async fn positions_only_change_before_voting() {
    let f = fixture(Publicity::Voter);
    let position = json!({ "name": "Treasurer", "max_votes": 1, "candidates": ["Carol", "Dan"] });

    let before = send(context(&f.store, at(2023, 12, 31, 23)), "POST", "/api/election/council-2024/positions", Some(&f.commissioner), Some(position.clone())).await;
    assert_eq!(before.status(), StatusCode::CREATED);

    let during = send(context(&f.store, at(2024, 1, 1, 0)), "POST", "/api/election/council-2024/positions", Some(&f.commissioner), Some(position)).await;
    assert_eq!(during.status(), StatusCode::CONFLICT);

    let listed = send(context(&f.store, at(2024, 1, 1, 0)), "GET", "/api/election/council-2024/positions", Some(&f.voter), None).await;
    assert_eq!(listed.status(), StatusCode::OK);
    let body = body_json(&listed);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["candidates"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ballot_is_cast_once_during_the_window() {
    let f = fixture(Publicity::Voter);
    let position = add_president(&f);
    let ballot = json!({
        "selections": [{ "position_id": position.id, "candidate_ids": [position.candidates[0].id] }],
    });
    let path = "/api/election/council-2024/ballot";

    let early = send(context(&f.store, at(2023, 12, 31, 23)), "POST", path, Some(&f.voter), Some(ballot.clone())).await;
    assert_eq!(early.status(), StatusCode::FORBIDDEN);

    let ctx = context(&f.store, at(2024, 1, 3, 23));
    let by_commissioner = send(ctx.clone(), "POST", path, Some(&f.commissioner), Some(ballot.clone())).await;
    assert_eq!(by_commissioner.status(), StatusCode::FORBIDDEN);

    let invalid = json!({ "selections": [{ "position_id": position.id, "candidate_ids": [] }] });
    let rejected = send(ctx.clone(), "POST", path, Some(&f.voter), Some(invalid)).await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let cast = send(ctx.clone(), "POST", path, Some(&f.voter), Some(ballot.clone())).await;
    assert_eq!(cast.status(), StatusCode::CREATED);
    assert_eq!(f.store.vote_count(&f.election.id), 1);

    let again = send(ctx.clone(), "POST", path, Some(&f.voter), Some(ballot.clone())).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(f.store.vote_count(&f.election.id), 1);

    let view = send(ctx.clone(), "GET", "/api/election/council-2024", Some(&f.voter), None).await;
    assert_eq!(body_json(&view)["has_voted"], true);

    let removal = send(ctx, "DELETE", &format!("/api/election/council-2024/voters/{}", f.voter), Some(&f.commissioner), None).await;
    assert_eq!(removal.status(), StatusCode::CONFLICT);

    let late = send(context(&f.store, at(2024, 1, 4, 0)), "POST", path, Some(&f.voter), Some(ballot)).await;
    assert_eq!(late.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_routes_and_bodies() {
    let f = fixture(Publicity::Public);
    let ctx = context(&f.store, at(2024, 1, 2, 0));

    let unknown = send(ctx.clone(), "GET", "/api/nothing-here", None, None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let garbled = warp::test::request()
        .method("POST")
        .path("/api/election/council-2024/ballot")
        .header(session::USER_HEADER, f.voter.to_string())
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&routes(ctx))
        .await;
    assert_eq!(garbled.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_identity_header_is_anonymous() {
    let f = fixture(Publicity::Public);
    let ctx = context(&f.store, at(2024, 1, 2, 0));

    let response = warp::test::request()
        .method("GET")
        .path("/api/election/council-2024")
        .header(session::USER_HEADER, &b"\xffuser"[..])
        .reply(&routes(ctx))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["role"], "anonymous");
}

#[tokio::test]
async fn sign_in_callback_keeps_query() {
    let f = fixture(Publicity::Voter);
    let ctx = context(&f.store, at(2024, 1, 2, 0));

    let response = send(ctx, "GET", "/api/election/council-2024?tab=ballot", None, None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://vote.example.org/sign-in?callbackUrl=%2Fapi%2Felection%2Fcouncil-2024%3Ftab%3Dballot"
    );
}

#[tokio::test]
async fn only_commissioners_delete() {
    let f = fixture(Publicity::Public);
    let ctx = context(&f.store, at(2024, 1, 2, 0));
    let stranger = Id::new();

    for user in [None, Some(&f.voter), Some(&stranger)] {
        let response = send(ctx.clone(), "DELETE", "/api/election/council-2024", user, None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{user:?}");
    }
    assert!(!f.store.election(&f.election.id).unwrap().is_deleted());
}

#[tokio::test]
async fn only_commissioners_edit_public_elections() {
    let f = fixture(Publicity::Public);
    let ctx = context(&f.store, at(2023, 12, 20, 0));
    let stranger = Id::new();
    let update = json!({ "name": "Taken Over" });
    let position = json!({ "name": "Treasurer", "candidates": ["Carol", "Dan"] });

    for user in [None, Some(&f.voter), Some(&stranger)] {
        let patched = send(ctx.clone(), "PATCH", "/api/election/council-2024", user, Some(update.clone())).await;
        assert_eq!(patched.status(), StatusCode::FORBIDDEN, "{user:?}");

        let added = send(ctx.clone(), "POST", "/api/election/council-2024/positions", user, Some(position.clone())).await;
        assert_eq!(added.status(), StatusCode::FORBIDDEN, "{user:?}");
    }
    assert_eq!(f.store.election(&f.election.id).unwrap().name, f.election.name);
    assert!(f.store.positions(&f.election.id).unwrap().is_empty());
}

#[tokio::test]
async fn commissioner_who_is_also_voter_casts() {
    let f = fixture(Publicity::Voter);
    f.store.add_voter(&f.election.id, &f.commissioner).unwrap();
    let position = add_president(&f);
    let ctx = context(&f.store, at(2024, 1, 2, 12));
    let ballot = json!({
        "selections": [{ "position_id": position.id, "candidate_ids": [position.candidates[1].id] }],
    });

    let cast = send(ctx.clone(), "POST", "/api/election/council-2024/ballot", Some(&f.commissioner), Some(ballot)).await;
    assert_eq!(cast.status(), StatusCode::CREATED);
    assert_eq!(f.store.vote_count(&f.election.id), 1);

    let view = send(ctx, "GET", "/api/election/council-2024", Some(&f.commissioner), None).await;
    let body = body_json(&view);
    assert_eq!(body["role"], "commissioner");
    assert_eq!(body["has_voted"], true);
}
