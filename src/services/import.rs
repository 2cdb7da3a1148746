//! JSON document array → `sensor_readings`, keyed by synthetic ids.

use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, info};
use rand::RngCore;
use std::path::Path;

use crate::db::key::ReadingKey;
use crate::db::models::NewSensorReading;
use crate::models::reading::ReadingDocument;
use crate::schema;
use crate::services::snapshot::load_documents;
use crate::timestamps::TimestampPolicy;

/// Rows per INSERT statement; 6 bind parameters each keeps us well under the
/// PostgreSQL limit of 65535.
const INSERT_CHUNK_ROWS: usize = 5_000;

pub fn run(conn: &mut PgConnection, path: &Path, policy: &TimestampPolicy) -> Result<usize, String> {
    let docs = load_documents(path)?;
    info!("Import: {} document(s) read from {}", docs.len(), path.display());

    let rows = build_rows(&docs, policy, &mut rand::rng())?;
    let inserted = insert_sensor_readings(conn, &rows)?;
    info!("Import: inserted {} row(s) with timestamp-derived ids", inserted);
    Ok(inserted)
}

/// Parse every document and derive its key; keeps document order.
pub fn build_rows<R: RngCore + ?Sized>(
    docs: &[ReadingDocument],
    policy: &TimestampPolicy,
    rng: &mut R,
) -> Result<Vec<NewSensorReading>, String> {
    docs.iter()
        .enumerate()
        .map(|(index, doc)| {
            let reading = doc
                .to_reading(policy)
                .map_err(|e| format!("document [{}]: {}", index, e))?;
            let key = ReadingKey::generate_with(policy.unix_seconds(reading.timestamp), &mut *rng)
                .map_err(|e| format!("document [{}]: {}", index, e))?;
            debug!("Import: document [{}] at {} -> id {}", index, reading.timestamp, key);
            Ok(NewSensorReading::new(key, policy.to_utc(reading.timestamp), &reading))
        })
        .collect()
}

/// One transaction for the whole batch; a duplicate key aborts everything.
pub fn insert_sensor_readings(conn: &mut PgConnection, rows: &[NewSensorReading]) -> Result<usize, String> {
    if rows.is_empty() {
        return Ok(0);
    }

    use schema::sensor_readings::dsl as R;

    conn.transaction::<usize, diesel::result::Error, _>(|conn| {
        let mut total = 0;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            total += diesel::insert_into(R::sensor_readings).values(chunk).execute(conn)?;
        }
        Ok(total)
    })
    .map_err(|e| format!("insert sensor rows failed: {}", e))
}
