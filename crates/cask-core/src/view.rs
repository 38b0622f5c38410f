//! List presentation state — a pure derivation over the beer collection.
//!
//! `view` is recomputed whenever any input changes; collection sizes are a
//! personal catalog, not a web-scale dataset, so no incremental diffing.

use std::{cmp::Ordering, collections::HashMap};

use uuid::Uuid;

use crate::beer::Beer;

// ─── Filters ─────────────────────────────────────────────────────────────────

/// The field a filter matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
  /// ISO country code.
  Country,
  /// Resolved brewery display name.
  Brewery,
  /// Beer style string.
  Style,
}

impl FilterField {
  pub fn label(self) -> &'static str {
    match self {
      Self::Country => "country",
      Self::Brewery => "brewery",
      Self::Style => "style",
    }
  }
}

/// One active filter. At most one per field; filters are a conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
  pub field: FilterField,
  pub value: String,
}

// ─── Sort ────────────────────────────────────────────────────────────────────

/// Total orders over the beer list. Rating sorts fall back to the beer's
/// own aggregate when the map has no entry, and to 0 when the beer has
/// none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
  NameAsc,
  NameDesc,
  CountryAsc,
  CountryDesc,
  RatingAsc,
  RatingDesc,
  GlobalRatingAsc,
  #[default]
  GlobalRatingDesc,
}

impl SortKey {
  pub const ALL: [SortKey; 8] = [
    SortKey::GlobalRatingDesc,
    SortKey::GlobalRatingAsc,
    SortKey::RatingDesc,
    SortKey::RatingAsc,
    SortKey::NameAsc,
    SortKey::NameDesc,
    SortKey::CountryAsc,
    SortKey::CountryDesc,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Self::NameAsc => "Name A-Z",
      Self::NameDesc => "Name Z-A",
      Self::CountryAsc => "Country A-Z",
      Self::CountryDesc => "Country Z-A",
      Self::RatingAsc => "Rating ↑",
      Self::RatingDesc => "Rating ↓",
      Self::GlobalRatingAsc => "Global Rating ↑",
      Self::GlobalRatingDesc => "Global Rating ↓",
    }
  }

  /// The next option in selector order, wrapping.
  pub fn next(self) -> Self {
    let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
    Self::ALL[(i + 1) % Self::ALL.len()]
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Everything the list derivation depends on besides the collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
  /// Case-insensitive substring match on beer name; empty passes all.
  pub search:  String,
  pub filters: Vec<Filter>,
  pub sort:    SortKey,
}

impl ListQuery {
  /// Set a filter, replacing any existing filter on the same field.
  pub fn set_filter(&mut self, field: FilterField, value: String) {
    self.filters.retain(|f| f.field != field);
    self.filters.push(Filter { field, value });
  }

  pub fn clear_filters(&mut self) {
    self.filters.clear();
  }

  pub fn filter(&self, field: FilterField) -> Option<&str> {
    self
      .filters
      .iter()
      .find(|f| f.field == field)
      .map(|f| f.value.as_str())
  }

  fn matches(&self, beer: &Beer) -> bool {
    if !self.search.is_empty()
      && !beer
        .name
        .to_lowercase()
        .contains(&self.search.to_lowercase())
    {
      return false;
    }
    self.filters.iter().all(|f| match f.field {
      FilterField::Country => beer.country_iso == f.value,
      FilterField::Brewery => beer.brewery == f.value,
      FilterField::Style => beer.style == f.value,
    })
  }
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Derive the ordered, filtered beer list.
///
/// Pure function of (collection, query, rating maps). `slice::sort_by` is
/// stable, so beers with equal sort keys keep their arrival order.
pub fn view<'a>(
  beers: &'a [Beer],
  query: &ListQuery,
  personal: &HashMap<Uuid, f64>,
  global: &HashMap<Uuid, f64>,
) -> Vec<&'a Beer> {
  let mut rows: Vec<&Beer> =
    beers.iter().filter(|b| query.matches(b)).collect();

  rows.sort_by(|a, b| match query.sort {
    SortKey::NameAsc => a.name.cmp(&b.name),
    SortKey::NameDesc => b.name.cmp(&a.name),
    SortKey::CountryAsc => a.country_iso.cmp(&b.country_iso),
    SortKey::CountryDesc => b.country_iso.cmp(&a.country_iso),
    SortKey::RatingAsc => by_rating(a, b, personal),
    SortKey::RatingDesc => by_rating(b, a, personal),
    SortKey::GlobalRatingAsc => by_rating(a, b, global),
    SortKey::GlobalRatingDesc => by_rating(b, a, global),
  });
  rows
}

/// The rating a sort sees for a beer: the map entry, else the beer's own
/// aggregate, else 0.
pub fn rating_or_aggregate(map: &HashMap<Uuid, f64>, beer: &Beer) -> f64 {
  map
    .get(&beer.id)
    .copied()
    .or(beer.overall_rating)
    .unwrap_or(0.0)
}

fn by_rating(a: &Beer, b: &Beer, map: &HashMap<Uuid, f64>) -> Ordering {
  rating_or_aggregate(map, a).total_cmp(&rating_or_aggregate(map, b))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn beer(name: &str, iso: &str, brewery: &str) -> Beer {
    Beer {
      id: Uuid::new_v4(),
      name: name.into(),
      brewery_id: None,
      brewery: brewery.into(),
      country_iso: iso.into(),
      style: "Lager".into(),
      description: None,
      abv: None,
      tags: Vec::new(),
      image: None,
      overall_rating: None,
      aroma_rating: None,
      taste_rating: None,
      after_taste_rating: None,
    }
  }

  fn names(rows: &[&Beer]) -> Vec<String> {
    rows.iter().map(|b| b.name.clone()).collect()
  }

  #[test]
  fn empty_search_passes_all() {
    let beers = vec![beer("Alpha", "PT", "X"), beer("Beta", "DE", "Y")];
    let query = ListQuery { sort: SortKey::NameAsc, ..Default::default() };
    let rows = view(&beers, &query, &HashMap::new(), &HashMap::new());
    assert_eq!(rows.len(), 2);
  }

  #[test]
  fn search_is_case_insensitive_substring() {
    let beers = vec![
      beer("Vienna Lager", "AT", "X"),
      beer("Doppelbock", "DE", "Y"),
    ];
    let query = ListQuery { search: "LAGER".into(), ..Default::default() };
    let rows = view(&beers, &query, &HashMap::new(), &HashMap::new());
    assert_eq!(names(&rows), ["Vienna Lager"]);
  }

  #[test]
  fn filters_are_conjunctive() {
    let beers = vec![
      beer("A", "PT", "X"), // matches both
      beer("B", "PT", "Y"), // matches country only
      beer("C", "DE", "X"), // matches brewery only
    ];
    let mut query = ListQuery { sort: SortKey::NameAsc, ..Default::default() };
    query.set_filter(FilterField::Country, "PT".into());
    query.set_filter(FilterField::Brewery, "X".into());

    let rows = view(&beers, &query, &HashMap::new(), &HashMap::new());
    assert_eq!(names(&rows), ["A"]);
  }

  #[test]
  fn setting_a_filter_replaces_same_field() {
    let mut query = ListQuery::default();
    query.set_filter(FilterField::Country, "PT".into());
    query.set_filter(FilterField::Country, "DE".into());
    assert_eq!(query.filters.len(), 1);
    assert_eq!(query.filter(FilterField::Country), Some("DE"));
  }

  #[test]
  fn rating_sort_uses_map_then_aggregate_then_zero() {
    let mut high = beer("High", "PT", "X");
    high.overall_rating = Some(2.0); // aggregate, overridden by map
    let mut mid = beer("Mid", "PT", "X");
    mid.overall_rating = Some(3.0); // aggregate fallback
    let low = beer("Low", "PT", "X"); // no entry anywhere → 0

    let mut personal = HashMap::new();
    personal.insert(high.id, 4.5);

    let beers = vec![low, mid, high];
    let query = ListQuery { sort: SortKey::RatingDesc, ..Default::default() };
    let rows = view(&beers, &query, &personal, &HashMap::new());
    assert_eq!(names(&rows), ["High", "Mid", "Low"]);
  }

  #[test]
  fn sort_is_stable_for_equal_keys() {
    let beers = vec![
      beer("First", "PT", "X"),
      beer("Second", "PT", "Y"),
      beer("Third", "DE", "Z"),
    ];
    let query =
      ListQuery { sort: SortKey::CountryDesc, ..Default::default() };
    let rows = view(&beers, &query, &HashMap::new(), &HashMap::new());
    // PT beers tie; arrival order preserved.
    assert_eq!(names(&rows), ["First", "Second", "Third"]);
  }

  #[test]
  fn sort_cycle_visits_every_option() {
    let mut seen = vec![];
    let mut key = SortKey::default();
    for _ in 0..SortKey::ALL.len() {
      seen.push(key);
      key = key.next();
    }
    assert_eq!(key, SortKey::default());
    for option in SortKey::ALL {
      assert!(seen.contains(&option));
    }
  }
}
