//! Catalog record types — beers and their lookup tables.
//!
//! Wire field names are the backend's column names (camelCase). The local
//! `brewery` display name is resolved client-side from the breweries cache
//! and never comes over the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rated beer. Created externally; read-only to this client except for
/// the aggregate rating fields, which the backend recomputes as a running
/// average whenever a rating is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beer {
  pub id:          Uuid,
  pub name:        String,
  /// Foreign key into the breweries table. Nullable on the backend.
  pub brewery_id:  Option<Uuid>,
  /// Display name resolved client-side; `""` until resolution runs.
  #[serde(default)]
  pub brewery:     String,
  pub country_iso: String,
  /// Beer style, e.g. "IPA". The backend column is named `type`.
  #[serde(rename = "type")]
  pub style:       String,
  pub description: Option<String>,
  /// Alcohol by volume, percent.
  pub abv:         Option<f64>,
  #[serde(default)]
  pub tags:        Vec<String>,
  /// Base64 label image, when the backend has one.
  pub image:       Option<String>,

  // Aggregate rating quadruple, maintained server-side across all raters.
  pub overall_rating:     Option<f64>,
  pub aroma_rating:       Option<f64>,
  pub taste_rating:       Option<f64>,
  pub after_taste_rating: Option<f64>,
}

/// A brewery lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brewery {
  pub id:   Uuid,
  pub name: String,
}

/// A country lookup row, keyed by its ISO 3166-1 alpha-2 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub iso:  String,
  pub name: String,
}

/// A beer style the filter UI can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeerType {
  pub name: String,
}
