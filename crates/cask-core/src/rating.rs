//! Rating types and the incremental submission gate.
//!
//! A rating scores three dimensions. Nothing is written remotely until all
//! three are present in the same draft; the overall value is derived at
//! construction time and cannot be set on its own.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Score ───────────────────────────────────────────────────────────────────

/// A half-star step in (0, 5].
///
/// Zero is unrepresentable: an unset dimension is `Option::<Score>::None`,
/// so a literal zero rating can never be submitted.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(u8);

impl Score {
  pub const MIN: Score = Score(1);
  pub const MAX: Score = Score(10);

  /// Build from a star value. Fails for zero, out-of-range values, and
  /// values not on a half-star step.
  pub fn from_stars(stars: f64) -> Result<Self> {
    let half_steps = stars * 2.0;
    if !(1.0..=10.0).contains(&half_steps) || half_steps.fract() != 0.0 {
      return Err(Error::InvalidScore(stars));
    }
    Ok(Self(half_steps as u8))
  }

  pub fn stars(self) -> f64 {
    f64::from(self.0) / 2.0
  }

  /// One half-star up, saturating at five stars.
  pub fn half_step_up(self) -> Self {
    Self(self.0.min(9) + 1)
  }

  /// One half-star down, saturating at the half-star floor.
  pub fn half_step_down(self) -> Self {
    Self(self.0.max(2) - 1)
  }
}

impl TryFrom<f64> for Score {
  type Error = Error;

  fn try_from(stars: f64) -> Result<Self> {
    Self::from_stars(stars)
  }
}

impl From<Score> for f64 {
  fn from(score: Score) -> f64 {
    score.stars()
  }
}

impl std::fmt::Display for Score {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:.1}", self.stars())
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// One scored dimension of a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Aroma,
  Taste,
  Aftertaste,
}

impl Category {
  pub const ALL: [Category; 3] =
    [Category::Aroma, Category::Taste, Category::Aftertaste];

  pub fn label(self) -> &'static str {
    match self {
      Self::Aroma => "Aroma",
      Self::Taste => "Taste",
      Self::Aftertaste => "Aftertaste",
    }
  }

  /// The next dimension in display order, wrapping.
  pub fn next(self) -> Self {
    match self {
      Self::Aroma => Self::Taste,
      Self::Taste => Self::Aftertaste,
      Self::Aftertaste => Self::Aroma,
    }
  }

  pub fn prev(self) -> Self {
    self.next().next()
  }
}

// ─── UserRating ──────────────────────────────────────────────────────────────

/// A rater's own rating for one beer.
///
/// Unique on (user_id, beer_id); the backend upserts on that key, so
/// resubmission overwrites and no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
  pub user_id:            Uuid,
  pub beer_id:            Uuid,
  pub aroma_rating:       Score,
  pub taste_rating:       Score,
  pub after_taste_rating: Score,
  /// Derived at construction: `(aroma + taste + aftertaste) / 3`, in stars.
  /// Private so it cannot drift from the dimensions.
  overall_rating:         f64,
}

impl UserRating {
  pub fn new(
    user_id: Uuid,
    beer_id: Uuid,
    aroma: Score,
    taste: Score,
    aftertaste: Score,
  ) -> Self {
    let overall = (aroma.stars() + taste.stars() + aftertaste.stars()) / 3.0;
    Self {
      user_id,
      beer_id,
      aroma_rating: aroma,
      taste_rating: taste,
      after_taste_rating: aftertaste,
      overall_rating: overall,
    }
  }

  pub fn overall(&self) -> f64 {
    self.overall_rating
  }

  pub fn score(&self, category: Category) -> Score {
    match category {
      Category::Aroma => self.aroma_rating,
      Category::Taste => self.taste_rating,
      Category::Aftertaste => self.after_taste_rating,
    }
  }
}

// ─── RatingDraft ─────────────────────────────────────────────────────────────

/// The local, possibly partial rating for one (rater, beer) pair.
///
/// Dimensions accumulate locally; [`RatingDraft::set`] returns the finished
/// [`UserRating`] only once all three are present. That return value is the
/// only path to a remote write — a partial draft never leaves the client.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDraft {
  pub user_id:    Uuid,
  pub beer_id:    Uuid,
  pub aroma:      Option<Score>,
  pub taste:      Option<Score>,
  pub aftertaste: Option<Score>,
}

impl RatingDraft {
  pub fn new(user_id: Uuid, beer_id: Uuid) -> Self {
    Self {
      user_id,
      beer_id,
      aroma: None,
      taste: None,
      aftertaste: None,
    }
  }

  /// Seed a draft from an already-persisted rating.
  pub fn from_rating(rating: &UserRating) -> Self {
    Self {
      user_id: rating.user_id,
      beer_id: rating.beer_id,
      aroma: Some(rating.aroma_rating),
      taste: Some(rating.taste_rating),
      aftertaste: Some(rating.after_taste_rating),
    }
  }

  pub fn get(&self, category: Category) -> Option<Score> {
    match category {
      Category::Aroma => self.aroma,
      Category::Taste => self.taste,
      Category::Aftertaste => self.aftertaste,
    }
  }

  /// Merge one dimension into the draft.
  ///
  /// Returns the complete rating exactly when the merge leaves all three
  /// dimensions present — the submission gate. `None` means the value was
  /// held locally and no remote write may be issued.
  pub fn set(&mut self, category: Category, score: Score) -> Option<UserRating> {
    match category {
      Category::Aroma => self.aroma = Some(score),
      Category::Taste => self.taste = Some(score),
      Category::Aftertaste => self.aftertaste = Some(score),
    }
    self.complete()
  }

  /// The finished rating, if every dimension has been scored.
  pub fn complete(&self) -> Option<UserRating> {
    Some(UserRating::new(
      self.user_id,
      self.beer_id,
      self.aroma?,
      self.taste?,
      self.aftertaste?,
    ))
  }
}

// ─── SubmitState ─────────────────────────────────────────────────────────────

/// Lifecycle of one rating submission, kept explicit so the UI can show
/// what happened to the last write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
  /// Draft incomplete or untouched; nothing has been sent.
  #[default]
  Editing,
  /// The gate fired and the upsert is in flight.
  Pending,
  /// The remote store acknowledged the upsert.
  Committed,
  /// The upsert failed. The draft is retained as-is so touching any star
  /// re-runs the gate with the same values and re-attempts the write.
  Failed,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn score(stars: f64) -> Score {
    Score::from_stars(stars).unwrap()
  }

  // ── Score ──────────────────────────────────────────────────────────────

  #[test]
  fn score_accepts_half_steps() {
    for half_steps in 1..=10u8 {
      let stars = f64::from(half_steps) / 2.0;
      assert_eq!(score(stars).stars(), stars);
    }
  }

  #[test]
  fn score_rejects_zero() {
    assert!(Score::from_stars(0.0).is_err());
  }

  #[test]
  fn score_rejects_out_of_range_and_off_step() {
    assert!(Score::from_stars(5.5).is_err());
    assert!(Score::from_stars(-1.0).is_err());
    assert!(Score::from_stars(3.25).is_err());
  }

  #[test]
  fn score_steps_saturate() {
    assert_eq!(Score::MAX.half_step_up(), Score::MAX);
    assert_eq!(Score::MIN.half_step_down(), Score::MIN);
    assert_eq!(score(3.0).half_step_up(), score(3.5));
    assert_eq!(score(3.0).half_step_down(), score(2.5));
  }

  #[test]
  fn score_serde_round_trip() {
    let json = serde_json::to_string(&score(4.5)).unwrap();
    assert_eq!(json, "4.5");
    let back: Score = serde_json::from_str(&json).unwrap();
    assert_eq!(back, score(4.5));
    assert!(serde_json::from_str::<Score>("0.0").is_err());
  }

  // ── Gate ───────────────────────────────────────────────────────────────

  #[test]
  fn gate_holds_until_all_three_dimensions_present() {
    let mut draft = RatingDraft::new(Uuid::new_v4(), Uuid::new_v4());

    assert!(draft.set(Category::Aroma, score(3.0)).is_none());
    assert!(draft.set(Category::Taste, score(4.0)).is_none());

    let rating = draft.set(Category::Aftertaste, score(5.0)).unwrap();
    assert_eq!(rating.overall(), 4.0);
  }

  #[test]
  fn gate_fires_on_every_touch_once_complete() {
    let mut draft = RatingDraft::new(Uuid::new_v4(), Uuid::new_v4());
    draft.set(Category::Aroma, score(3.0));
    draft.set(Category::Taste, score(3.0));
    assert!(draft.set(Category::Aftertaste, score(3.0)).is_some());

    // Re-touching a dimension re-fires the gate with the merged values.
    let rating = draft.set(Category::Aroma, score(5.0)).unwrap();
    assert_eq!(rating.aroma_rating, score(5.0));
    assert_eq!(rating.overall(), (5.0 + 3.0 + 3.0) / 3.0);
  }

  #[test]
  fn overall_is_exact_mean_of_half_steps() {
    let rating = UserRating::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      score(4.5),
      score(3.5),
      score(5.0),
    );
    assert_eq!(rating.overall(), (4.5 + 3.5 + 5.0) / 3.0);
  }

  #[test]
  fn draft_round_trips_through_rating() {
    let rating = UserRating::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      score(1.0),
      score(2.5),
      score(4.0),
    );
    let draft = RatingDraft::from_rating(&rating);
    assert_eq!(draft.complete(), Some(rating));
  }

  #[test]
  fn user_rating_wire_field_names() {
    let rating = UserRating::new(
      Uuid::nil(),
      Uuid::nil(),
      score(4.0),
      score(4.0),
      score(4.0),
    );
    let value = serde_json::to_value(&rating).unwrap();
    for key in
      ["userId", "beerId", "aromaRating", "tasteRating", "afterTasteRating"]
    {
      assert!(value.get(key).is_some(), "missing wire field {key}");
    }
    assert_eq!(value["overallRating"], serde_json::json!(4.0));
  }
}
