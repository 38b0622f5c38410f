//! The `CatalogStore` trait — the injected seam between the client and the
//! remote record store.
//!
//! The trait is implemented by storage backends (`cask-store-http` for the
//! hosted backend, [`crate::memory::MemoryStore`] as the in-process fake).
//! The UI depends on this abstraction, not on any concrete backend, so
//! tests can substitute a fake store.

use std::future::Future;

use uuid::Uuid;

use crate::{
  beer::{Beer, BeerType, Brewery, Country},
  feed::ChangeFeed,
  rating::UserRating,
};

/// Abstraction over the remote catalog and rating store.
///
/// Reads are one-shot snapshots; `subscribe_*` delivers the change feed
/// that keeps a snapshot warm. All methods return `Send` futures so the
/// trait can be used from multi-threaded async runtimes.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── One-shot fetches ──────────────────────────────────────────────────

  fn list_beers(
    &self,
  ) -> impl Future<Output = Result<Vec<Beer>, Self::Error>> + Send + '_;

  fn list_breweries(
    &self,
  ) -> impl Future<Output = Result<Vec<Brewery>, Self::Error>> + Send + '_;

  fn list_countries(
    &self,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + '_;

  fn list_beer_types(
    &self,
  ) -> impl Future<Output = Result<Vec<BeerType>, Self::Error>> + Send + '_;

  /// All ratings belonging to `user_id`. Warms the personal ratings map at
  /// startup.
  fn list_ratings(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<UserRating>, Self::Error>> + Send + '_;

  /// The rater's rating for one beer, if any.
  fn fetch_rating(
    &self,
    user_id: Uuid,
    beer_id: Uuid,
  ) -> impl Future<Output = Result<Option<UserRating>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert-or-update keyed on (user_id, beer_id). Resubmission overwrites
  /// the prior record; the backend keeps no duplicates and no history.
  fn upsert_rating(
    &self,
    rating: UserRating,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Change feeds ──────────────────────────────────────────────────────

  /// Subscribe to beer row changes. Dropping the feed unsubscribes.
  fn subscribe_beers(
    &self,
  ) -> impl Future<Output = Result<ChangeFeed<Beer>, Self::Error>> + Send + '_;

  fn subscribe_breweries(
    &self,
  ) -> impl Future<Output = Result<ChangeFeed<Brewery>, Self::Error>> + Send + '_;

  fn subscribe_countries(
    &self,
  ) -> impl Future<Output = Result<ChangeFeed<Country>, Self::Error>> + Send + '_;

  /// Row changes for the whole ratings table; the reconciler filters down
  /// to the current rater.
  fn subscribe_ratings(
    &self,
  ) -> impl Future<Output = Result<ChangeFeed<UserRating>, Self::Error>> + Send + '_;
}
