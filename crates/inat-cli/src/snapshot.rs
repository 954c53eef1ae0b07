//! Snapshot files: a JSON array of raw observation records, exactly as the
//! API returns them.

use std::{
  fs::File,
  io::{BufReader, BufWriter, Write as _},
  path::Path,
};

use anyhow::Context as _;
use serde::Serialize as _;
use serde_json::{Value, ser::PrettyFormatter};

pub fn load(path: &Path) -> anyhow::Result<Vec<Value>> {
  let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
  serde_json::from_reader(BufReader::new(file))
    .with_context(|| format!("reading {} as a JSON array of observations", path.display()))
}

/// Write `records` as a pretty-printed array, four-space indented.
pub fn save(path: &Path, records: &[Value]) -> anyhow::Result<()> {
  let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
  let mut writer = BufWriter::new(file);
  let formatter = PrettyFormatter::with_indent(b"    ");
  let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
  records
    .serialize(&mut ser)
    .with_context(|| format!("writing {}", path.display()))?;
  writer.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("observations.json");
    let records = vec![
      json!({ "id": 2, "user": { "id": 1 } }),
      json!({ "id": 1, "user": { "id": 1 }, "photos": [] }),
    ];

    save(&path, &records).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("[\n    {"));
    assert_eq!(load(&path).unwrap(), records);
  }

  #[test]
  fn load_rejects_non_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("object.json");
    std::fs::write(&path, r#"{ "results": [] }"#).unwrap();
    let err = load(&path).unwrap_err();
    assert!(err.to_string().contains("JSON array"));
  }

  #[test]
  fn load_reports_missing_file() {
    let err = load(Path::new("/nonexistent/observations.json")).unwrap_err();
    assert!(err.to_string().contains("opening"));
  }
}
