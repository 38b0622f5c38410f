//! Integration tests for `HttpStore` against a mock backend.

use std::time::Duration;

use uuid::Uuid;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_partial_json, header, method, path, query_param},
};

use cask_core::{
  feed::{ChangeEvent, ChangeFeed, FeedEvent},
  rating::{Score, UserRating},
  store::CatalogStore,
};

use crate::{Error, HttpConfig, HttpStore};

async fn next_event<T>(feed: &mut ChangeFeed<T>) -> FeedEvent<T> {
  tokio::time::timeout(Duration::from_secs(5), feed.recv())
    .await
    .expect("feed timed out")
    .expect("feed closed")
}

fn store_for(server: &MockServer) -> HttpStore {
  let mut config = HttpConfig::new(server.uri(), "test-key");
  config.reconnect_delay = Duration::from_millis(10);
  HttpStore::new(config).expect("client")
}

fn beer_row(id: Uuid, name: &str) -> serde_json::Value {
  serde_json::json!({
    "id": id,
    "name": name,
    "breweryId": null,
    "countryIso": "PT",
    "type": "Lager",
    "description": "crisp",
    "abv": 5.0,
    "tags": ["session"],
    "image": null,
    "overallRating": 3.5,
    "aromaRating": 3.0,
    "tasteRating": 4.0,
    "afterTasteRating": 3.5
  })
}

fn rating(user: Uuid, beer: Uuid) -> UserRating {
  let score = |s| Score::from_stars(s).unwrap();
  UserRating::new(user, beer, score(4.0), score(4.0), score(4.0))
}

// ─── One-shot fetches ────────────────────────────────────────────────────────

#[tokio::test]
async fn list_beers_deserializes_wire_rows() {
  let server = MockServer::start().await;
  let id = Uuid::new_v4();

  Mock::given(method("GET"))
    .and(path("/rest/v1/Beer"))
    .and(header("apikey", "test-key"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(vec![beer_row(id, "Coruja")]),
    )
    .mount(&server)
    .await;

  let beers = store_for(&server).list_beers().await.unwrap();
  assert_eq!(beers.len(), 1);
  assert_eq!(beers[0].id, id);
  assert_eq!(beers[0].style, "Lager");
  // The display name is client-resolved, never a wire column.
  assert_eq!(beers[0].brewery, "");
}

#[tokio::test]
async fn list_ratings_sends_user_filter() {
  let server = MockServer::start().await;
  let user = Uuid::new_v4();

  Mock::given(method("GET"))
    .and(path("/rest/v1/UserRating"))
    .and(query_param("userId", format!("eq.{user}")))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(vec![rating(user, Uuid::new_v4())]),
    )
    .expect(1)
    .mount(&server)
    .await;

  let rows = store_for(&server).list_ratings(user).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].user_id, user);
}

#[tokio::test]
async fn fetch_rating_absent_returns_none() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/rest/v1/UserRating"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(Vec::<UserRating>::new()),
    )
    .mount(&server)
    .await;

  let found = store_for(&server)
    .fetch_rating(Uuid::new_v4(), Uuid::new_v4())
    .await
    .unwrap();
  assert!(found.is_none());
}

#[tokio::test]
async fn fetch_failure_surfaces_status() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/rest/v1/Beer"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  let err = store_for(&server).list_beers().await.unwrap_err();
  assert!(matches!(err, Error::Status { status, .. } if status == 500));
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_sends_conflict_key_and_merge_preference() {
  let server = MockServer::start().await;
  let user = Uuid::new_v4();
  let beer = Uuid::new_v4();

  Mock::given(method("POST"))
    .and(path("/rest/v1/UserRating"))
    .and(query_param("on_conflict", "userId,beerId"))
    .and(header("Prefer", "resolution=merge-duplicates"))
    .and(body_partial_json(serde_json::json!({
      "userId": user,
      "beerId": beer,
      "overallRating": 4.0,
    })))
    .respond_with(ResponseTemplate::new(201))
    .expect(1)
    .mount(&server)
    .await;

  store_for(&server).upsert_rating(rating(user, beer)).await.unwrap();
}

#[tokio::test]
async fn upsert_failure_surfaces_status() {
  let server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/rest/v1/UserRating"))
    .respond_with(ResponseTemplate::new(503))
    .mount(&server)
    .await;

  let err = store_for(&server)
    .upsert_rating(rating(Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Status { status, .. } if status == 503));
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_streams_changes_then_resyncs_after_loss() {
  let server = MockServer::start().await;
  let id = Uuid::new_v4();

  let insert = serde_json::json!({ "type": "INSERT", "new": beer_row(id, "Coruja") });
  let update = serde_json::json!({
    "type": "UPDATE",
    "old": beer_row(id, "Coruja"),
    "new": beer_row(id, "Coruja Preta"),
  });
  let ndjson = format!("{insert}\n{update}\n");

  // The mock body ends after two events, which the task treats as a lost
  // stream: it re-fetches the table and delivers a Resync before
  // reconnecting.
  Mock::given(method("GET"))
    .and(path("/feed/v1/Beer"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_raw(ndjson, "application/x-ndjson"),
    )
    .mount(&server)
    .await;

  Mock::given(method("GET"))
    .and(path("/rest/v1/Beer"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(vec![beer_row(id, "Coruja Preta")]),
    )
    .mount(&server)
    .await;

  let store = store_for(&server);
  let mut feed = store.subscribe_beers().await.unwrap();

  let first = next_event(&mut feed).await;
  assert!(matches!(
    first,
    FeedEvent::Change(ChangeEvent::Insert { ref new }) if new.name == "Coruja"
  ));

  let second = next_event(&mut feed).await;
  assert!(matches!(
    second,
    FeedEvent::Change(ChangeEvent::Update { ref new, .. })
      if new.name == "Coruja Preta"
  ));

  let third = next_event(&mut feed).await;
  assert!(matches!(
    third,
    FeedEvent::Resync(ref rows) if rows.len() == 1
  ));
}

#[tokio::test]
async fn feed_skips_malformed_lines() {
  let server = MockServer::start().await;
  let id = Uuid::new_v4();

  let good = serde_json::json!({ "type": "INSERT", "new": beer_row(id, "Bock") });
  let ndjson = format!("not json\n{good}\n");

  Mock::given(method("GET"))
    .and(path("/feed/v1/Beer"))
    .respond_with(
      ResponseTemplate::new(200).set_body_raw(ndjson, "application/x-ndjson"),
    )
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/rest/v1/Beer"))
    .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
    .mount(&server)
    .await;

  let store = store_for(&server);
  let mut feed = store.subscribe_beers().await.unwrap();

  let event = next_event(&mut feed).await;
  assert!(matches!(
    event,
    FeedEvent::Change(ChangeEvent::Insert { ref new }) if new.name == "Bock"
  ));
}
