//! [`HttpStore`] — the REST + change-feed implementation of
//! [`CatalogStore`].

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use cask_core::{
  beer::{Beer, BeerType, Brewery, Country},
  feed::ChangeFeed,
  rating::UserRating,
  store::CatalogStore,
};

use crate::{Error, Result, feed};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  pub base_url: String,
  /// API key, sent as both the `apikey` header and a bearer token.
  pub api_key:  String,
  /// Total-time limit for one-shot requests. The change-feed request is
  /// deliberately long-lived and is issued from a client without it.
  pub timeout:  Duration,
  /// Delay before a dropped feed stream is re-established.
  pub reconnect_delay: Duration,
}

impl HttpConfig {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      api_key: api_key.into(),
      timeout: Duration::from_secs(30),
      reconnect_delay: Duration::from_secs(2),
    }
  }
}

/// The hosted-backend catalog store.
///
/// Cheap to clone — the inner [`reqwest::Client`]s are `Arc`-based.
#[derive(Clone)]
pub struct HttpStore {
  client:      Client,
  feed_client: Client,
  config:      Arc<HttpConfig>,
}

impl HttpStore {
  pub fn new(config: HttpConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    // No total-time limit: a healthy feed connection stays open for hours.
    let feed_client = Client::builder().build()?;
    Ok(Self {
      client,
      feed_client,
      config: Arc::new(config),
    })
  }

  pub(crate) fn config(&self) -> &HttpConfig {
    &self.config
  }

  fn base(&self) -> &str {
    self.config.base_url.trim_end_matches('/')
  }

  pub(crate) fn rest_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{table}", self.base())
  }

  pub(crate) fn feed_url(&self, table: &str) -> String {
    format!("{}/feed/v1/{table}", self.base())
  }

  fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req
      .header("apikey", &self.config.api_key)
      .bearer_auth(&self.config.api_key)
  }

  pub(crate) fn feed_request(&self, table: &str) -> reqwest::RequestBuilder {
    self.authed(self.feed_client.get(self.feed_url(table)))
  }

  /// `GET /rest/v1/<table>` with optional PostgREST-style filters.
  pub(crate) async fn fetch_all<T: DeserializeOwned>(
    &self,
    table: &str,
    filters: &[(&str, String)],
  ) -> Result<Vec<T>> {
    let url = self.rest_url(table);
    let resp = self
      .authed(self.client.get(&url))
      .query(filters)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { status, url });
    }
    Ok(resp.json().await?)
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for HttpStore {
  type Error = Error;

  async fn list_beers(&self) -> Result<Vec<Beer>> {
    self.fetch_all("Beer", &[]).await
  }

  async fn list_breweries(&self) -> Result<Vec<Brewery>> {
    self.fetch_all("Brewery", &[]).await
  }

  async fn list_countries(&self) -> Result<Vec<Country>> {
    self.fetch_all("Country", &[]).await
  }

  async fn list_beer_types(&self) -> Result<Vec<BeerType>> {
    self.fetch_all("BeerType", &[]).await
  }

  async fn list_ratings(&self, user_id: Uuid) -> Result<Vec<UserRating>> {
    self
      .fetch_all("UserRating", &[("userId", format!("eq.{user_id}"))])
      .await
  }

  async fn fetch_rating(
    &self,
    user_id: Uuid,
    beer_id: Uuid,
  ) -> Result<Option<UserRating>> {
    let rows: Vec<UserRating> = self
      .fetch_all(
        "UserRating",
        &[
          ("userId", format!("eq.{user_id}")),
          ("beerId", format!("eq.{beer_id}")),
        ],
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  /// `POST /rest/v1/UserRating?on_conflict=userId,beerId` with the
  /// merge-duplicates preference — the backend overwrites the existing
  /// row for the key pair instead of erroring on the unique constraint.
  async fn upsert_rating(&self, rating: UserRating) -> Result<()> {
    let url = self.rest_url("UserRating");
    let resp = self
      .authed(self.client.post(&url))
      .query(&[("on_conflict", "userId,beerId")])
      .header("Prefer", "resolution=merge-duplicates")
      .json(&rating)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { status, url });
    }
    Ok(())
  }

  async fn subscribe_beers(&self) -> Result<ChangeFeed<Beer>> {
    Ok(feed::spawn(self.clone(), "Beer"))
  }

  async fn subscribe_breweries(&self) -> Result<ChangeFeed<Brewery>> {
    Ok(feed::spawn(self.clone(), "Brewery"))
  }

  async fn subscribe_countries(&self) -> Result<ChangeFeed<Country>> {
    Ok(feed::spawn(self.clone(), "Country"))
  }

  async fn subscribe_ratings(&self) -> Result<ChangeFeed<UserRating>> {
    Ok(feed::spawn(self.clone(), "UserRating"))
  }
}
