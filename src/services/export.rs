//! `sensor_readings` → JSON document array, keys stripped.

use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, info, warn};
use std::path::Path;

use crate::db::key::ReadingKey;
use crate::db::models::StoredReading;
use crate::models::reading::{ReadingDocument, SensorReading};
use crate::schema;
use crate::services::snapshot::write_json;
use crate::timestamps::TimestampPolicy;

pub fn run(conn: &mut PgConnection, path: &Path, policy: &TimestampPolicy) -> Result<usize, String> {
    use schema::sensor_readings::dsl as R;

    let rows: Vec<StoredReading> = R::sensor_readings
        .order(R::time.asc())
        .select(StoredReading::as_select())
        .load(conn)
        .map_err(|e| format!("fetch sensor rows failed: {}", e))?;
    info!("Export: fetched {} row(s)", rows.len());

    let docs = to_documents(&rows, policy);
    write_json(path, &docs)?;
    info!("Export: wrote {} document(s) to {}", docs.len(), path.display());
    Ok(docs.len())
}

/// Drop the key and render `time` as local ISO text.
pub fn to_documents(rows: &[StoredReading], policy: &TimestampPolicy) -> Vec<ReadingDocument> {
    rows.iter()
        .map(|row| {
            match ReadingKey::try_from(row.id.as_slice()) {
                Ok(key) if i64::from(key.unix_seconds()) != row.time.timestamp() => {
                    warn!("Export: row {} does not match its time {}", key, row.time)
                }
                Ok(key) => debug!("Export: row {} at {}", key, row.time),
                Err(e) => warn!("Export: row at {} has a malformed id: {}", row.time, e),
            }
            ReadingDocument::from_reading(&SensorReading {
                timestamp: policy.to_local(row.time),
                ph: row.ph,
                tds: row.tds,
                turbidity: row.turbidity,
                temperature: row.temperature,
            })
        })
        .collect()
}
