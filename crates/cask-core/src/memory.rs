//! In-memory [`CatalogStore`] — the reference backend.
//!
//! The substitutable fake that the injected-store design exists for: tests
//! (and offline demos) construct one, seed it, and hand it to the same code
//! paths that normally talk to the hosted backend. Mutations fan change
//! events out to live subscribers the way the remote feed does.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  Error,
  beer::{Beer, BeerType, Brewery, Country},
  feed::{ChangeEvent, ChangeFeed, FeedEvent},
  rating::UserRating,
  store::CatalogStore,
};

/// Cheap to clone — all state lives behind one shared lock. The lock is
/// never held across an await point.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  beers:      Vec<Beer>,
  breweries:  Vec<Brewery>,
  countries:  Vec<Country>,
  beer_types: Vec<BeerType>,
  ratings:    Vec<UserRating>,

  beer_subs:    Vec<mpsc::Sender<FeedEvent<Beer>>>,
  brewery_subs: Vec<mpsc::Sender<FeedEvent<Brewery>>>,
  country_subs: Vec<mpsc::Sender<FeedEvent<Country>>>,
  rating_subs:  Vec<mpsc::Sender<FeedEvent<UserRating>>>,
}

/// Push an event to every live subscriber. A subscriber that went away or
/// stopped draining its channel is dropped from the list.
fn broadcast<T: Clone>(
  subs: &mut Vec<mpsc::Sender<FeedEvent<T>>>,
  event: ChangeEvent<T>,
) {
  let event = FeedEvent::Change(event);
  subs.retain(|tx| tx.try_send(event.clone()).is_ok());
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    // Lock poisoning only happens if a writer panicked; the data itself
    // is still coherent for a test double.
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  // ── Backend-side mutations (what an admin or another client does) ─────

  /// Insert or overwrite a beer row, emitting the matching change event.
  pub fn put_beer(&self, beer: Beer) {
    let mut inner = self.lock();
    let event = match inner.beers.iter_mut().find(|b| b.id == beer.id) {
      Some(existing) => {
        let old = std::mem::replace(existing, beer.clone());
        ChangeEvent::Update { old, new: beer }
      }
      None => {
        inner.beers.push(beer.clone());
        ChangeEvent::Insert { new: beer }
      }
    };
    broadcast(&mut inner.beer_subs, event);
  }

  pub fn remove_beer(&self, id: Uuid) {
    let mut inner = self.lock();
    let Some(pos) = inner.beers.iter().position(|b| b.id == id) else {
      return;
    };
    let old = inner.beers.remove(pos);
    broadcast(&mut inner.beer_subs, ChangeEvent::Delete { old });
  }

  pub fn put_brewery(&self, brewery: Brewery) {
    let mut inner = self.lock();
    let event =
      match inner.breweries.iter_mut().find(|b| b.id == brewery.id) {
        Some(existing) => {
          let old = std::mem::replace(existing, brewery.clone());
          ChangeEvent::Update { old, new: brewery }
        }
        None => {
          inner.breweries.push(brewery.clone());
          ChangeEvent::Insert { new: brewery }
        }
      };
    broadcast(&mut inner.brewery_subs, event);
  }

  pub fn put_country(&self, country: Country) {
    let mut inner = self.lock();
    let event =
      match inner.countries.iter_mut().find(|c| c.iso == country.iso) {
        Some(existing) => {
          let old = std::mem::replace(existing, country.clone());
          ChangeEvent::Update { old, new: country }
        }
        None => {
          inner.countries.push(country.clone());
          ChangeEvent::Insert { new: country }
        }
      };
    broadcast(&mut inner.country_subs, event);
  }

  pub fn put_beer_type(&self, beer_type: BeerType) {
    let mut inner = self.lock();
    if !inner.beer_types.contains(&beer_type) {
      inner.beer_types.push(beer_type);
    }
  }

  /// Count of persisted rating rows — for asserting upsert idempotence.
  pub fn rating_count(&self) -> usize {
    self.lock().ratings.len()
  }
}

impl CatalogStore for MemoryStore {
  type Error = Error;

  async fn list_beers(&self) -> Result<Vec<Beer>, Error> {
    Ok(self.lock().beers.clone())
  }

  async fn list_breweries(&self) -> Result<Vec<Brewery>, Error> {
    Ok(self.lock().breweries.clone())
  }

  async fn list_countries(&self) -> Result<Vec<Country>, Error> {
    Ok(self.lock().countries.clone())
  }

  async fn list_beer_types(&self) -> Result<Vec<BeerType>, Error> {
    Ok(self.lock().beer_types.clone())
  }

  async fn list_ratings(&self, user_id: Uuid) -> Result<Vec<UserRating>, Error> {
    Ok(
      self
        .lock()
        .ratings
        .iter()
        .filter(|r| r.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn fetch_rating(
    &self,
    user_id: Uuid,
    beer_id: Uuid,
  ) -> Result<Option<UserRating>, Error> {
    Ok(
      self
        .lock()
        .ratings
        .iter()
        .find(|r| r.user_id == user_id && r.beer_id == beer_id)
        .cloned(),
    )
  }

  async fn upsert_rating(&self, rating: UserRating) -> Result<(), Error> {
    let mut inner = self.lock();
    let event = match inner
      .ratings
      .iter_mut()
      .find(|r| r.user_id == rating.user_id && r.beer_id == rating.beer_id)
    {
      Some(existing) => {
        let old = std::mem::replace(existing, rating.clone());
        ChangeEvent::Update { old, new: rating }
      }
      None => {
        inner.ratings.push(rating.clone());
        ChangeEvent::Insert { new: rating }
      }
    };
    broadcast(&mut inner.rating_subs, event);
    Ok(())
  }

  async fn subscribe_beers(&self) -> Result<ChangeFeed<Beer>, Error> {
    let (tx, feed) = ChangeFeed::channel();
    self.lock().beer_subs.push(tx);
    Ok(feed)
  }

  async fn subscribe_breweries(&self) -> Result<ChangeFeed<Brewery>, Error> {
    let (tx, feed) = ChangeFeed::channel();
    self.lock().brewery_subs.push(tx);
    Ok(feed)
  }

  async fn subscribe_countries(&self) -> Result<ChangeFeed<Country>, Error> {
    let (tx, feed) = ChangeFeed::channel();
    self.lock().country_subs.push(tx);
    Ok(feed)
  }

  async fn subscribe_ratings(&self) -> Result<ChangeFeed<UserRating>, Error> {
    let (tx, feed) = ChangeFeed::channel();
    self.lock().rating_subs.push(tx);
    Ok(feed)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::Catalog;
  use crate::rating::Score;

  fn score(stars: f64) -> Score {
    Score::from_stars(stars).unwrap()
  }

  fn rating(user: Uuid, beer: Uuid, stars: f64) -> UserRating {
    UserRating::new(user, beer, score(stars), score(stars), score(stars))
  }

  #[tokio::test]
  async fn upsert_is_idempotent_per_key() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let beer = Uuid::new_v4();

    store.upsert_rating(rating(user, beer, 4.0)).await.unwrap();
    store.upsert_rating(rating(user, beer, 4.0)).await.unwrap();

    assert_eq!(store.rating_count(), 1);
    let stored = store.fetch_rating(user, beer).await.unwrap().unwrap();
    assert_eq!(stored.overall(), 4.0);
  }

  #[tokio::test]
  async fn resubmission_overwrites_not_duplicates() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let beer = Uuid::new_v4();

    store.upsert_rating(rating(user, beer, 2.0)).await.unwrap();
    store.upsert_rating(rating(user, beer, 5.0)).await.unwrap();

    assert_eq!(store.rating_count(), 1);
    let stored = store.fetch_rating(user, beer).await.unwrap().unwrap();
    assert_eq!(stored.overall(), 5.0);
  }

  #[tokio::test]
  async fn fetch_rating_missing_returns_none() {
    let store = MemoryStore::new();
    let found =
      store.fetch_rating(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
    assert!(found.is_none());
  }

  #[tokio::test]
  async fn upsert_reaches_rating_subscribers() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let beer = Uuid::new_v4();
    let mut feed = store.subscribe_ratings().await.unwrap();

    store.upsert_rating(rating(user, beer, 3.0)).await.unwrap();
    store.upsert_rating(rating(user, beer, 4.5)).await.unwrap();

    let first = feed.try_recv().unwrap();
    assert!(matches!(
      first,
      FeedEvent::Change(ChangeEvent::Insert { .. })
    ));
    let second = feed.try_recv().unwrap();
    assert!(matches!(
      second,
      FeedEvent::Change(ChangeEvent::Update { .. })
    ));
  }

  #[tokio::test]
  async fn feed_round_trip_updates_catalog() {
    let store = MemoryStore::new();
    let me = Uuid::new_v4();
    let beer_id = Uuid::new_v4();
    let mut catalog = Catalog::new();
    let mut feed = store.subscribe_ratings().await.unwrap();

    store.upsert_rating(rating(me, beer_id, 4.0)).await.unwrap();
    store
      .upsert_rating(rating(Uuid::new_v4(), beer_id, 1.0))
      .await
      .unwrap();

    while let Some(event) = feed.try_recv() {
      catalog.apply_rating_event(me, event);
    }
    assert_eq!(catalog.personal_ratings().get(&beer_id), Some(&4.0));
  }
}
