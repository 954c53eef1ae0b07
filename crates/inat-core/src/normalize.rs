//! Decomposition of one raw observation into ordered row upserts.
//!
//! Normalization is a depth-first walk over the typed record tree. Every
//! dependency (taxon, photo, user, conservation status) is planned before the
//! row that references it, and the key it returns is written into the
//! referencing column. Photos and identifications are detached from the
//! observation and planned after it, since they point back at it.
//!
//! The result is a [`WritePlan`] which an [`ObservationStore`] applies in one
//! transaction.

use serde::Deserialize;
use serde_json::Value;

use crate::{
  Error, Result,
  record::{ConservationStatus, Identification, Observation, Photo, Taxon, User},
  store::{ObservationStore, Write},
  table::{Key, Row, Table},
};

/// Verbose fields that duplicate information already present elsewhere.
const OBSERVATION_DROPPED: [&str; 3] =
  ["observed_on_details", "created_at_details", "observed_on_string"];

const IDENTIFICATION_DROPPED: [&str; 3] =
  ["created_at_details", "taxon_id", "previous_observation_taxon_id"];

/// Ancestor chains follow taxonomic rank depth, which is a few dozen levels
/// at most.
pub const MAX_TAXON_DEPTH: usize = 64;

// ─── WritePlan ───────────────────────────────────────────────────────────────

/// Writes accumulated while normalizing one observation, in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
  writes: Vec<Write>,
}

impl WritePlan {
  pub fn new() -> Self { Self::default() }

  /// Queue an upsert of `row` and return the key it will be stored under.
  pub fn upsert(&mut self, table: Table, row: Row) -> Result<Key> {
    let schema = table.schema();
    let Some(key) = schema.key_of(&row) else {
      let column = schema
        .primary_key
        .iter()
        .copied()
        .find(|col| row.get(*col).and_then(Key::from_value).is_none())
        .unwrap_or_default();
      return Err(Error::MissingKey { table: schema.name, column });
    };
    self.writes.push(Write::Upsert { table, row });
    Ok(key)
  }

  /// Queue creation of `table`, once per plan.
  pub fn ensure_table(&mut self, table: Table) {
    let write = Write::EnsureTable(table);
    if !self.writes.contains(&write) {
      self.writes.push(write);
    }
  }

  pub fn writes(&self) -> &[Write] { &self.writes }

  pub fn into_writes(self) -> Vec<Write> { self.writes }

  pub fn len(&self) -> usize { self.writes.len() }

  pub fn is_empty(&self) -> bool { self.writes.is_empty() }

  /// Rows queued for `table`, in order.
  pub fn rows(&self, table: Table) -> impl Iterator<Item = &Row> + '_ {
    self.writes.iter().filter_map(move |w| match w {
      Write::Upsert { table: t, row } if *t == table => Some(row),
      _ => None,
    })
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Normalize `raw` and persist it through `store`. Returns the observation's
/// primary key.
pub async fn normalize_and_store<S: ObservationStore>(raw: &Value, store: &S) -> Result<Key> {
  let observation = Observation::deserialize(raw)?;
  let (key, plan) = plan_observation(observation)?;
  tracing::debug!(observation = %key, writes = plan.len(), "storing observation");
  store
    .apply(plan.into_writes())
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(key)
}

/// Build the write plan for one observation without touching a store.
pub fn plan_observation(observation: Observation) -> Result<(Key, WritePlan)> {
  let mut plan = WritePlan::new();
  let key = plan_observation_into(&mut plan, observation)?;
  Ok((key, plan))
}

// ─── Per-entity normalization ────────────────────────────────────────────────

fn plan_observation_into(plan: &mut WritePlan, observation: Observation) -> Result<Key> {
  let Observation {
    id,
    location,
    taxon,
    user,
    photos,
    identifications,
    mut extra,
  } = observation;

  let (latitude, longitude) = split_location(location.as_deref())?;
  for field in OBSERVATION_DROPPED {
    extra.remove(field);
  }

  let taxon_key = taxon.map(|t| plan_taxon(plan, t, 0)).transpose()?;
  let user_key = plan_user(plan, user)?;

  let mut row = extra;
  row.insert("id".into(), id.into());
  row.insert("taxon".into(), key_or_null(taxon_key));
  row.insert("user".into(), user_key.to_value());
  row.insert("latitude".into(), latitude);
  row.insert("longitude".into(), longitude);
  let observation_key = plan.upsert(Table::Observations, row)?;

  for photo in photos.unwrap_or_default() {
    let photo_key = plan_photo(plan, photo)?;
    let mut link = Row::new();
    link.insert("observations_id".into(), observation_key.to_value());
    link.insert("photos_id".into(), photo_key.to_value());
    plan.upsert(Table::ObservationsPhotos, link)?;
  }

  for identification in identifications.unwrap_or_default() {
    plan_identification(plan, identification, &observation_key)?;
  }

  Ok(observation_key)
}

fn plan_taxon(plan: &mut WritePlan, taxon: Taxon, depth: usize) -> Result<Key> {
  if depth > MAX_TAXON_DEPTH {
    return Err(Error::AncestryTooDeep(MAX_TAXON_DEPTH));
  }

  let Taxon {
    id,
    default_photo,
    conservation_status,
    ancestors,
    extra,
  } = taxon;

  let photo_key = default_photo.map(|p| plan_photo(plan, p)).transpose()?;
  let status_key = match conservation_status {
    Some(status) => {
      plan.ensure_table(Table::ConservationStatus);
      Some(plan_conservation_status(plan, status)?)
    }
    None => None,
  };

  // Ancestors only populate their own rows; no edge is stored on this one.
  for ancestor in ancestors.unwrap_or_default() {
    plan_taxon(plan, ancestor, depth + 1)?;
  }

  let mut row = extra;
  row.insert("id".into(), id.into());
  row.insert("default_photo".into(), key_or_null(photo_key));
  row.insert("conservation_status".into(), key_or_null(status_key));
  plan.upsert(Table::Taxons, row)
}

fn plan_photo(plan: &mut WritePlan, photo: Photo) -> Result<Key> {
  let Photo {
    id,
    url,
    medium_url,
    original_dimensions,
    extra,
  } = photo;

  let dimensions = original_dimensions.unwrap_or_default();
  let medium_url = medium_url.or_else(|| url.as_deref().and_then(derive_medium_url));

  let mut row = extra;
  row.insert("id".into(), id.into());
  row.insert("url".into(), url.map_or(Value::Null, Value::from));
  row.insert("medium_url".into(), medium_url.map_or(Value::Null, Value::from));
  row.insert("width".into(), dimensions.width.map_or(Value::Null, Value::from));
  row.insert("height".into(), dimensions.height.map_or(Value::Null, Value::from));
  plan.upsert(Table::Photos, row)
}

fn plan_user(plan: &mut WritePlan, user: User) -> Result<Key> {
  let mut row = user.extra;
  row.insert("id".into(), user.id.into());
  plan.upsert(Table::Users, row)
}

fn plan_conservation_status(plan: &mut WritePlan, status: ConservationStatus) -> Result<Key> {
  let mut row = status.extra;
  row.insert("status_name".into(), status.status_name.into());
  plan.upsert(Table::ConservationStatus, row)
}

fn plan_identification(
  plan: &mut WritePlan,
  identification: Identification,
  observation: &Key,
) -> Result<Key> {
  let Identification {
    id,
    taxon,
    previous_observation_taxon,
    user,
    mut extra,
  } = identification;

  for field in IDENTIFICATION_DROPPED {
    extra.remove(field);
  }

  let user_key = plan_user(plan, user)?;
  let taxon_key = plan_taxon(plan, taxon, 0)?;
  let previous_key = previous_observation_taxon
    .map(|t| plan_taxon(plan, t, 0))
    .transpose()?;

  let mut row = extra;
  row.insert("id".into(), id.into());
  row.insert("observation".into(), observation.to_value());
  row.insert("user".into(), user_key.to_value());
  row.insert("taxon".into(), taxon_key.to_value());
  row.insert("previous_observation_taxon".into(), key_or_null(previous_key));
  plan.upsert(Table::Identifications, row)
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn key_or_null(key: Option<Key>) -> Value { key.map_or(Value::Null, |k| k.to_value()) }

/// Split a `"lat,lon"` string on its first comma. A missing or empty
/// location has no coordinates; a non-empty one without a comma is an error.
fn split_location(location: Option<&str>) -> Result<(Value, Value)> {
  match location.filter(|l| !l.is_empty()) {
    Some(l) => {
      let (lat, lon) = l
        .split_once(',')
        .ok_or_else(|| Error::BadLocation(l.to_owned()))?;
      Ok((lat.into(), lon.into()))
    }
    None => Ok((Value::Null, Value::Null)),
  }
}

/// `…/square.jpg` (optionally followed by a query string) becomes
/// `…/medium.jpg`.
fn derive_medium_url(url: &str) -> Option<String> {
  const SQUARE: &str = "/square.jpg";
  const MEDIUM: &str = "/medium.jpg";

  let (path, query) = match url.split_once('?') {
    Some((path, query)) => (path, Some(query)),
    None => (url, None),
  };
  let stem = path.strip_suffix(SQUARE)?;
  Some(match query {
    Some(query) => format!("{stem}{MEDIUM}?{query}"),
    None => format!("{stem}{MEDIUM}"),
  })
}
