//! Diesel model structs for the `sensor_readings` table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::key::ReadingKey;
use crate::models::reading::SensorReading;
use crate::schema;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::sensor_readings)]
pub struct StoredReading {
    pub id: Vec<u8>,
    pub time: DateTime<Utc>,
    pub ph: f64,
    pub tds: f64,
    pub turbidity: f64,
    pub temperature: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::sensor_readings)]
pub struct NewSensorReading {
    pub id: Vec<u8>,
    pub time: DateTime<Utc>,
    pub ph: f64,
    pub tds: f64,
    pub turbidity: f64,
    pub temperature: f64,
}

impl NewSensorReading {
    pub fn new(key: ReadingKey, time: DateTime<Utc>, reading: &SensorReading) -> Self {
        NewSensorReading {
            id: key.to_vec(),
            time,
            ph: reading.ph,
            tds: reading.tds,
            turbidity: reading.turbidity,
            temperature: reading.temperature,
        }
    }
}
