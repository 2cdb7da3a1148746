//! Reading and writing JSON document snapshots.

use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::models::reading::{ReadingDocument, SensorReading};
use crate::timestamps::TimestampPolicy;

/// Parse a JSON array of reading documents. Shape errors name the failing
/// element, e.g. `[12].ph: invalid type`.
pub fn load_documents(path: &Path) -> Result<Vec<ReadingDocument>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));
    let docs: Vec<ReadingDocument> = serde_path_to_error::deserialize(&mut de)
        .map_err(|e| format!("{}: {} (at {})", path.display(), e.inner(), e.path()))?;
    debug!("Loaded {} document(s) from {}", docs.len(), path.display());
    Ok(docs)
}

/// Convert documents to readings, stably ordered by timestamp.
pub fn to_readings(docs: &[ReadingDocument], policy: &TimestampPolicy) -> Result<Vec<SensorReading>, String> {
    let mut readings = docs
        .iter()
        .enumerate()
        .map(|(index, doc)| {
            doc.to_reading(policy)
                .map_err(|e| format!("document [{}]: {}", index, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    readings.sort_by_key(|r| r.timestamp);
    Ok(readings)
}

pub fn load_readings(path: &Path, policy: &TimestampPolicy) -> Result<Vec<SensorReading>, String> {
    let docs = load_documents(path)?;
    to_readings(&docs, policy)
}

/// Pretty JSON with a four-space indent.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }
    let file = File::create(path).map_err(|e| format!("failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| format!("failed to serialize {}: {}", path.display(), e))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| format!("failed to write {}: {}", path.display(), e))
}
