//! Typed views of the raw records returned by the observations API.
//!
//! Only the fields the normalizer reasons about are typed. Everything else is
//! collected into a flattened `extra` map and passed through to the database
//! untouched, so new upstream fields become new columns without code changes.

use serde::Deserialize;

use crate::table::Row;

/// One recorded sighting, as listed by `GET /observations`.
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
  pub id:              i64,
  /// Combined `"lat,lon"` string.
  pub location:        Option<String>,
  pub taxon:           Option<Taxon>,
  pub user:            User,
  pub photos:          Option<Vec<Photo>>,
  pub identifications: Option<Vec<Identification>>,
  #[serde(flatten)]
  pub extra:           Row,
}

/// A node in the classification hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct Taxon {
  pub id:                  i64,
  pub default_photo:       Option<Photo>,
  pub conservation_status: Option<ConservationStatus>,
  /// Higher taxa, root first.
  pub ancestors:           Option<Vec<Taxon>>,
  #[serde(flatten)]
  pub extra:               Row,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
  pub id:                  i64,
  pub url:                 Option<String>,
  pub medium_url:          Option<String>,
  pub original_dimensions: Option<Dimensions>,
  #[serde(flatten)]
  pub extra:               Row,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Dimensions {
  pub width:  Option<i64>,
  pub height: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub id:    i64,
  #[serde(flatten)]
  pub extra: Row,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConservationStatus {
  pub status_name: String,
  #[serde(flatten)]
  pub extra:       Row,
}

/// A proposed classification attached to an observation.
#[derive(Debug, Clone, Deserialize)]
pub struct Identification {
  pub id:                         i64,
  pub taxon:                      Taxon,
  pub previous_observation_taxon: Option<Taxon>,
  pub user:                       User,
  #[serde(flatten)]
  pub extra:                      Row,
}
