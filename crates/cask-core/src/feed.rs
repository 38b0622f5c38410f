//! Change events and the realtime reconciler.
//!
//! A [`ChangeFeed`] delivers tagged row events for one collection in
//! delivery order. [`Catalog`] folds them into the in-memory collections
//! without a full re-fetch; a [`FeedEvent::Resync`] snapshot (sent by a
//! transport after re-establishing a lost stream) replaces the collection
//! wholesale.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  beer::{Beer, BeerType, Brewery, Country},
  rating::UserRating,
};

/// Display name used when a beer references a brewery the local cache does
/// not know about.
pub const UNKNOWN_BREWERY: &str = "Unknown Brewery";

// ─── Events ──────────────────────────────────────────────────────────────────

/// A single row change, tagged by kind with statically known payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ChangeEvent<T> {
  Insert { new: T },
  Update { old: T, new: T },
  Delete { old: T },
}

/// What a subscription delivers: ordered row changes, interleaved with full
/// snapshots whenever the transport had to reconnect and catch up.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<T> {
  Change(ChangeEvent<T>),
  /// Backlog catch-up after a reconnect; replaces the local collection.
  Resync(Vec<T>),
}

// ─── Feed handle ─────────────────────────────────────────────────────────────

/// Receiving end of one collection's change feed. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeFeed<T> {
  rx: mpsc::Receiver<FeedEvent<T>>,
}

impl<T> ChangeFeed<T> {
  /// Channel capacity. Bounded so a stalled consumer applies backpressure
  /// to the transport instead of events being dropped out of order.
  pub const CAPACITY: usize = 256;

  /// A feed plus the sender a transport pushes events into.
  pub fn channel() -> (mpsc::Sender<FeedEvent<T>>, Self) {
    let (tx, rx) = mpsc::channel(Self::CAPACITY);
    (tx, Self { rx })
  }

  /// Await the next event. `None` once the transport has gone away.
  pub async fn recv(&mut self) -> Option<FeedEvent<T>> {
    self.rx.recv().await
  }

  /// Non-blocking poll, for draining between UI frames.
  pub fn try_recv(&mut self) -> Option<FeedEvent<T>> {
    self.rx.try_recv().ok()
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// The in-memory cache of remote state: beers in arrival order, lookup
/// tables by key, and the two rating side-maps. Never the source of truth.
///
/// All mutation happens on one logical thread — user events and feed
/// deliveries are applied one at a time by the event loop, so no locking
/// is needed here.
#[derive(Debug, Default)]
pub struct Catalog {
  beers:      Vec<Beer>,
  breweries:  HashMap<Uuid, Brewery>,
  countries:  HashMap<String, Country>,
  beer_types: Vec<BeerType>,
  /// beer id → backend aggregate overall, kept current by beer events.
  global_ratings:   HashMap<Uuid, f64>,
  /// beer id → the current rater's own overall.
  personal_ratings: HashMap<Uuid, f64>,
}

impl Catalog {
  pub fn new() -> Self {
    Self::default()
  }

  // ── Seeding (one-shot fetches) ────────────────────────────────────────

  pub fn seed_breweries(&mut self, rows: Vec<Brewery>) {
    self.breweries = rows.into_iter().map(|b| (b.id, b)).collect();
  }

  pub fn seed_countries(&mut self, rows: Vec<Country>) {
    self.countries = rows.into_iter().map(|c| (c.iso.clone(), c)).collect();
  }

  pub fn seed_beer_types(&mut self, rows: Vec<BeerType>) {
    self.beer_types = rows;
  }

  /// Replace the beer collection, resolving brewery display names and
  /// rebuilding the global ratings side-map.
  pub fn seed_beers(&mut self, rows: Vec<Beer>) {
    self.global_ratings.clear();
    self.beers = rows;
    for beer in &mut self.beers {
      beer.brewery = resolve_brewery(&self.breweries, beer.brewery_id);
      if let Some(overall) = beer.overall_rating {
        self.global_ratings.insert(beer.id, overall);
      }
    }
  }

  pub fn seed_personal(&mut self, rows: &[UserRating]) {
    self.personal_ratings =
      rows.iter().map(|r| (r.beer_id, r.overall())).collect();
  }

  /// Record the rater's own overall for one beer (optimistic local write
  /// after a submission; the feed echo of the same value is a no-op).
  pub fn note_personal(&mut self, beer_id: Uuid, overall: f64) {
    self.personal_ratings.insert(beer_id, overall);
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn beers(&self) -> &[Beer] {
    &self.beers
  }

  pub fn beer(&self, id: Uuid) -> Option<&Beer> {
    self.beers.iter().find(|b| b.id == id)
  }

  pub fn breweries(&self) -> &HashMap<Uuid, Brewery> {
    &self.breweries
  }

  pub fn beer_types(&self) -> &[BeerType] {
    &self.beer_types
  }

  /// Country display name for an ISO code, falling back to the code.
  pub fn country_name<'a>(&'a self, iso: &'a str) -> &'a str {
    self.countries.get(iso).map(|c| c.name.as_str()).unwrap_or(iso)
  }

  pub fn global_ratings(&self) -> &HashMap<Uuid, f64> {
    &self.global_ratings
  }

  pub fn personal_ratings(&self) -> &HashMap<Uuid, f64> {
    &self.personal_ratings
  }

  // ── Feed application ──────────────────────────────────────────────────

  pub fn apply_beer_event(&mut self, event: FeedEvent<Beer>) {
    match event {
      FeedEvent::Resync(rows) => self.seed_beers(rows),
      FeedEvent::Change(ChangeEvent::Insert { new }) => self.insert_beer(new),
      FeedEvent::Change(ChangeEvent::Update { old, new }) => {
        self.update_beer(&old, new);
      }
      FeedEvent::Change(ChangeEvent::Delete { old }) => {
        self.beers.retain(|b| b.id != old.id);
        self.global_ratings.remove(&old.id);
      }
    }
  }

  pub fn apply_brewery_event(&mut self, event: FeedEvent<Brewery>) {
    // A brewery rename does not rewrite display names already resolved
    // onto beers; only subsequent resolutions see the new name.
    match event {
      FeedEvent::Resync(rows) => self.seed_breweries(rows),
      FeedEvent::Change(ChangeEvent::Insert { new })
      | FeedEvent::Change(ChangeEvent::Update { new, .. }) => {
        self.breweries.insert(new.id, new);
      }
      FeedEvent::Change(ChangeEvent::Delete { old }) => {
        self.breweries.remove(&old.id);
      }
    }
  }

  pub fn apply_country_event(&mut self, event: FeedEvent<Country>) {
    match event {
      FeedEvent::Resync(rows) => self.seed_countries(rows),
      FeedEvent::Change(ChangeEvent::Insert { new })
      | FeedEvent::Change(ChangeEvent::Update { new, .. }) => {
        self.countries.insert(new.iso.clone(), new);
      }
      FeedEvent::Change(ChangeEvent::Delete { old }) => {
        self.countries.remove(&old.iso);
      }
    }
  }

  /// Fold a ratings-table event into the personal map. Events for other
  /// raters are ignored.
  pub fn apply_rating_event(
    &mut self,
    rater: Uuid,
    event: FeedEvent<UserRating>,
  ) {
    match event {
      FeedEvent::Resync(rows) => {
        self.personal_ratings = rows
          .iter()
          .filter(|r| r.user_id == rater)
          .map(|r| (r.beer_id, r.overall()))
          .collect();
      }
      FeedEvent::Change(ChangeEvent::Insert { new })
      | FeedEvent::Change(ChangeEvent::Update { new, .. }) => {
        if new.user_id == rater {
          self.personal_ratings.insert(new.beer_id, new.overall());
        }
      }
      FeedEvent::Change(ChangeEvent::Delete { old }) => {
        if old.user_id == rater {
          self.personal_ratings.remove(&old.beer_id);
        }
      }
    }
  }

  // ── Merge rules ───────────────────────────────────────────────────────

  /// INSERT: append if the id is not already present, resolving the
  /// brewery display name and recording the global-rating side entry.
  fn insert_beer(&mut self, mut new: Beer) {
    if self.beers.iter().any(|b| b.id == new.id) {
      return;
    }
    new.brewery = resolve_brewery(&self.breweries, new.brewery_id);
    if let Some(overall) = new.overall_rating {
      self.global_ratings.insert(new.id, overall);
    }
    self.beers.push(new);
  }

  /// UPDATE: copy each field into the local element only if it differs
  /// between the old and new snapshots — and, for nullable columns, only
  /// if the new snapshot actually carries a value. This keeps redundant
  /// echoes idempotent and never writes an absent value over a populated
  /// local field.
  fn update_beer(&mut self, old: &Beer, new: Beer) {
    let Some(beer) = self.beers.iter_mut().find(|b| b.id == new.id) else {
      return;
    };

    if new.name != old.name {
      beer.name = new.name;
    }
    if new.style != old.style {
      beer.style = new.style;
    }
    if new.tags != old.tags && !new.tags.is_empty() {
      beer.tags = new.tags;
    }
    if new.description != old.description && new.description.is_some() {
      beer.description = new.description;
    }
    if new.abv != old.abv && new.abv.is_some() {
      beer.abv = new.abv;
    }
    if new.image != old.image && new.image.is_some() {
      beer.image = new.image;
    }
    if new.country_iso != old.country_iso {
      beer.country_iso = new.country_iso;
    }
    if new.brewery_id != old.brewery_id {
      beer.brewery_id = new.brewery_id;
      beer.brewery = resolve_brewery(&self.breweries, new.brewery_id);
    }

    if new.overall_rating != old.overall_rating && new.overall_rating.is_some()
    {
      beer.overall_rating = new.overall_rating;
      if let Some(overall) = new.overall_rating {
        self.global_ratings.insert(new.id, overall);
      }
    }
    if new.aroma_rating != old.aroma_rating && new.aroma_rating.is_some() {
      beer.aroma_rating = new.aroma_rating;
    }
    if new.taste_rating != old.taste_rating && new.taste_rating.is_some() {
      beer.taste_rating = new.taste_rating;
    }
    if new.after_taste_rating != old.after_taste_rating
      && new.after_taste_rating.is_some()
    {
      beer.after_taste_rating = new.after_taste_rating;
    }
  }
}

fn resolve_brewery(
  breweries: &HashMap<Uuid, Brewery>,
  id: Option<Uuid>,
) -> String {
  id.and_then(|id| breweries.get(&id))
    .map(|b| b.name.clone())
    .unwrap_or_else(|| UNKNOWN_BREWERY.to_string())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
