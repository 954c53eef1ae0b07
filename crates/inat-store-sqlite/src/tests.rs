//! Integration tests for `SqliteStore` against an in-memory database.

use inat_core::{
  normalize_and_store,
  store::{ObservationStore, Write},
  table::{Key, Row, Table, OBSERVATIONS_WITH_PHOTOS},
};
use serde_json::{Value, json};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn row(value: Value) -> Row {
  match value {
    Value::Object(map) => map,
    other => panic!("not an object: {other}"),
  }
}

fn taxon(id: i64, name: &str) -> Value {
  json!({ "id": id, "name": name, "rank": "order", "default_photo": null })
}

fn observation() -> Value {
  json!({
    "id": 10,
    "location": "51.5,-0.12",
    "observed_on_details": { "day": 1 },
    "created_at_details": { "day": 1 },
    "observed_on_string": "2020-05-01",
    "quality_grade": "needs_id",
    "user": { "id": 1, "login": "walker", "name": "Walker" },
    "taxon": {
      "id": 300,
      "name": "Erithacus rubecula",
      "rank": "species",
      "preferred_common_name": "European Robin",
      "default_photo": {
        "id": 70,
        "url": "https://static.example.org/photos/70/square.jpg",
        "original_dimensions": { "width": 1024, "height": 768 }
      },
      "conservation_status": { "status_name": "least concern", "iucn": 10 },
      "ancestors": [taxon(100, "Passeriformes"), taxon(200, "Muscicapidae")]
    },
    "photos": [
      {
        "id": 71,
        "url": "https://static.example.org/photos/71/square.jpg",
        "original_dimensions": { "width": 640, "height": 480 }
      },
      {
        "id": 72,
        "url": "https://static.example.org/photos/72/square.jpg",
        "medium_url": "https://static.example.org/photos/72/custom.jpg",
        "original_dimensions": null
      }
    ],
    "identifications": [{
      "id": 900,
      "taxon_id": 300,
      "created_at": "2020-05-01T12:00:00Z",
      "created_at_details": { "day": 1 },
      "user": { "id": 2, "login": "birder" },
      "taxon": taxon(300, "Erithacus rubecula")
    }]
  })
}

async fn snapshot(s: &SqliteStore) -> Vec<(Table, u64)> {
  let mut counts = Vec::new();
  for table in Table::ALL {
    counts.push((table, s.count(table).await.unwrap()));
  }
  counts
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_creates_table_and_returns_key() {
  let s = store().await;
  let key = s
    .upsert(Table::Users, row(json!({ "id": 5, "login": "ana", "orcid": null })))
    .await
    .unwrap();
  assert_eq!(key, Key::Integer(5));

  let columns = s.columns(Table::Users).await.unwrap();
  assert_eq!(columns, ["id", "login", "name", "orcid"]);
}

#[tokio::test]
async fn upsert_overwrites_without_duplicating() {
  let s = store().await;
  s.upsert(Table::Users, row(json!({ "id": 5, "login": "ana", "name": "Ana" })))
    .await
    .unwrap();
  s.upsert(Table::Users, row(json!({ "id": 5, "login": "ana_b" })))
    .await
    .unwrap();

  assert_eq!(s.count(Table::Users).await.unwrap(), 1);
  let stored = s.get_row(Table::Users, Key::Integer(5)).await.unwrap().unwrap();
  assert_eq!(stored["login"], json!("ana_b"));
  // Columns the second row did not mention keep their values.
  assert_eq!(stored["name"], json!("Ana"));
}

#[tokio::test]
async fn upsert_widens_schema_for_new_fields() {
  let s = store().await;
  s.upsert(Table::Photos, row(json!({ "id": 1, "url": "u" })))
    .await
    .unwrap();
  s.upsert(
    Table::Photos,
    row(json!({ "id": 2, "url": "v", "license_code": "cc-by", "flags": [1, 2] })),
  )
  .await
  .unwrap();

  let columns = s.columns(Table::Photos).await.unwrap();
  assert!(columns.contains(&"license_code".to_owned()));
  assert!(columns.contains(&"flags".to_owned()));

  let stored = s.get_row(Table::Photos, Key::Integer(2)).await.unwrap().unwrap();
  assert_eq!(stored["flags"], json!("[1,2]"));
  let first = s.get_row(Table::Photos, Key::Integer(1)).await.unwrap().unwrap();
  assert_eq!(first["license_code"], Value::Null);
}

#[tokio::test]
async fn join_table_refuses_new_columns() {
  let s = store().await;
  let link = json!({ "observations_id": 1, "photos_id": 2 });
  s.upsert(Table::ObservationsPhotos, row(link)).await.unwrap();

  let err = s
    .upsert(
      Table::ObservationsPhotos,
      row(json!({ "observations_id": 1, "photos_id": 3, "position": 0 })),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SchemaLocked { table: "observations_photos", .. }));
}

#[tokio::test]
async fn composite_key_upsert_is_idempotent() {
  let s = store().await;
  for _ in 0..2 {
    let key = s
      .upsert(
        Table::ObservationsPhotos,
        row(json!({ "observations_id": 1, "photos_id": 2 })),
      )
      .await
      .unwrap();
    assert_eq!(key, Key::Composite(vec![Key::Integer(1), Key::Integer(2)]));
  }
  assert_eq!(s.count(Table::ObservationsPhotos).await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_without_key_fails() {
  let s = store().await;
  let err = s
    .upsert(Table::Users, row(json!({ "login": "nobody" })))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingKey { table: "users" }));
}

// ─── Tables and views ────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_table_is_idempotent() {
  let s = store().await;
  assert!(s.columns(Table::ConservationStatus).await.unwrap().is_empty());

  s.ensure_table(Table::ConservationStatus).await.unwrap();
  s.ensure_table(Table::ConservationStatus).await.unwrap();

  assert_eq!(s.columns(Table::ConservationStatus).await.unwrap(), ["status_name"]);
  assert_eq!(s.count(Table::ConservationStatus).await.unwrap(), 0);
}

#[tokio::test]
async fn create_view_is_a_no_op_when_present() {
  let s = store().await;
  for table in OBSERVATIONS_WITH_PHOTOS.depends_on {
    s.ensure_table(*table).await.unwrap();
  }
  assert!(s.create_view_if_absent(&OBSERVATIONS_WITH_PHOTOS).await.unwrap());
  assert!(!s.create_view_if_absent(&OBSERVATIONS_WITH_PHOTOS).await.unwrap());
}

#[tokio::test]
async fn apply_rolls_back_on_failure() {
  let s = store().await;
  let writes = vec![
    Write::Upsert {
      table: Table::Users,
      row:   row(json!({ "id": 1 })),
    },
    Write::Upsert {
      table: Table::Users,
      row:   row(json!({ "login": "missing id" })),
    },
  ];
  assert!(s.apply(writes).await.is_err());
  assert_eq!(s.count(Table::Users).await.unwrap(), 0);
}

// ─── Normalized observations ─────────────────────────────────────────────────

#[tokio::test]
async fn stores_every_entity() {
  let s = store().await;
  let key = normalize_and_store(&observation(), &s).await.unwrap();
  assert_eq!(key, Key::Integer(10));

  assert_eq!(s.count(Table::Observations).await.unwrap(), 1);
  assert_eq!(s.count(Table::Users).await.unwrap(), 2);
  assert_eq!(s.count(Table::Photos).await.unwrap(), 3);
  assert_eq!(s.count(Table::Taxons).await.unwrap(), 3);
  assert_eq!(s.count(Table::ConservationStatus).await.unwrap(), 1);
  assert_eq!(s.count(Table::Identifications).await.unwrap(), 1);
  assert_eq!(s.count(Table::ObservationsPhotos).await.unwrap(), 2);
}

#[tokio::test]
async fn storing_twice_is_idempotent() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();
  let counts = snapshot(&s).await;
  let first = s.get_row(Table::Observations, Key::Integer(10)).await.unwrap();
  let taxon = s.get_row(Table::Taxons, Key::Integer(300)).await.unwrap();

  normalize_and_store(&observation(), &s).await.unwrap();
  assert_eq!(snapshot(&s).await, counts);
  assert_eq!(s.get_row(Table::Observations, Key::Integer(10)).await.unwrap(), first);
  assert_eq!(s.get_row(Table::Taxons, Key::Integer(300)).await.unwrap(), taxon);
}

#[tokio::test]
async fn referenced_rows_exist() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();

  let obs = s.get_row(Table::Observations, Key::Integer(10)).await.unwrap().unwrap();
  assert_eq!(obs["taxon"], json!(300));
  assert_eq!(obs["user"], json!(1));
  assert!(s.get_row(Table::Taxons, Key::Integer(300)).await.unwrap().is_some());
  assert!(s.get_row(Table::Users, Key::Integer(1)).await.unwrap().is_some());

  let ident = s.get_row(Table::Identifications, Key::Integer(900)).await.unwrap().unwrap();
  assert_eq!(ident["observation"], json!(10));
  assert_eq!(ident["user"], json!(2));
  assert_eq!(ident["previous_observation_taxon"], Value::Null);
  assert!(!ident.contains_key("taxon_id"));
  assert!(!ident.contains_key("created_at_details"));
}

#[tokio::test]
async fn coordinates_and_dropped_fields() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();

  let obs = s.get_row(Table::Observations, Key::Integer(10)).await.unwrap().unwrap();
  assert_eq!(obs["latitude"], json!("51.5"));
  assert_eq!(obs["longitude"], json!("-0.12"));
  for dropped in ["observed_on_details", "created_at_details", "observed_on_string", "location"] {
    assert!(!obs.contains_key(dropped), "{dropped} should not be a column");
  }
}

#[tokio::test]
async fn missing_location_stores_nulls() {
  let s = store().await;
  let mut raw = observation();
  raw.as_object_mut().unwrap().remove("location");
  normalize_and_store(&raw, &s).await.unwrap();

  let obs = s.get_row(Table::Observations, Key::Integer(10)).await.unwrap().unwrap();
  assert_eq!(obs["latitude"], Value::Null);
  assert_eq!(obs["longitude"], Value::Null);
}

#[tokio::test]
async fn ancestors_become_taxon_rows() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();

  let order = s.get_row(Table::Taxons, Key::Integer(100)).await.unwrap().unwrap();
  assert_eq!(order["name"], json!("Passeriformes"));
  assert_eq!(order["conservation_status"], Value::Null);
  assert_eq!(order["default_photo"], Value::Null);
  assert!(s.get_row(Table::Taxons, Key::Integer(200)).await.unwrap().is_some());

  let species = s.get_row(Table::Taxons, Key::Integer(300)).await.unwrap().unwrap();
  assert_eq!(species["default_photo"], json!(70));
  assert_eq!(species["conservation_status"], json!("least concern"));
  assert!(!species.contains_key("ancestors"));
}

#[tokio::test]
async fn photo_urls_and_dimensions() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();

  let derived = s.get_row(Table::Photos, Key::Integer(71)).await.unwrap().unwrap();
  assert_eq!(
    derived["medium_url"],
    json!("https://static.example.org/photos/71/medium.jpg")
  );
  assert_eq!(derived["width"], json!(640));
  assert_eq!(derived["height"], json!(480));

  let explicit = s.get_row(Table::Photos, Key::Integer(72)).await.unwrap().unwrap();
  assert_eq!(
    explicit["medium_url"],
    json!("https://static.example.org/photos/72/custom.jpg")
  );
  assert_eq!(explicit["width"], Value::Null);
}

#[tokio::test]
async fn later_records_widen_observations() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();

  let mut raw = observation();
  raw["id"] = json!(11);
  raw["geoprivacy"] = json!("obscured");
  normalize_and_store(&raw, &s).await.unwrap();

  assert!(
    s.columns(Table::Observations)
      .await
      .unwrap()
      .contains(&"geoprivacy".to_owned())
  );
  let older = s.get_row(Table::Observations, Key::Integer(10)).await.unwrap().unwrap();
  assert_eq!(older["geoprivacy"], Value::Null);
}

#[tokio::test]
async fn view_joins_observations_to_photos() {
  let s = store().await;
  normalize_and_store(&observation(), &s).await.unwrap();
  assert!(s.create_view_if_absent(&OBSERVATIONS_WITH_PHOTOS).await.unwrap());

  let rows: Vec<(String, i64)> = s
    .conn
    .call(|conn| {
      let mut stmt = conn.prepare("SELECT photo, id FROM observations_with_photos ORDER BY photo")?;
      let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();

  assert_eq!(rows, [
    ("https://static.example.org/photos/71/medium.jpg".to_owned(), 10),
    ("https://static.example.org/photos/72/custom.jpg".to_owned(), 10),
  ]);
}
