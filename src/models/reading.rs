//! Water-quality reading models.
//!
//! `ReadingDocument` is the JSON wire shape shared by snapshots, imports and
//! exports. `SensorReading` is the parsed form the analytics pipeline works on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::timestamps::{format_iso, TimestampError, TimestampPolicy};

/// A document timestamp: plain text, or a Mongo extended-JSON `{"$date": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampField {
    Text(String),
    Extended {
        #[serde(rename = "$date")]
        date: String,
    },
}

impl TimestampField {
    pub fn as_str(&self) -> &str {
        match self {
            TimestampField::Text(s) => s,
            TimestampField::Extended { date } => date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDocument {
    pub timestamp: TimestampField,
    pub ph: f64,
    pub tds: f64,
    pub turbidity: f64,
    pub temperature: f64,
}

impl ReadingDocument {
    pub fn from_reading(reading: &SensorReading) -> Self {
        ReadingDocument {
            timestamp: TimestampField::Text(format_iso(reading.timestamp)),
            ph: reading.ph,
            tds: reading.tds,
            turbidity: reading.turbidity,
            temperature: reading.temperature,
        }
    }

    pub fn to_reading(&self, policy: &TimestampPolicy) -> Result<SensorReading, TimestampError> {
        Ok(SensorReading {
            timestamp: policy.parse(self.timestamp.as_str())?,
            ph: self.ph,
            tds: self.tds,
            turbidity: self.turbidity,
            temperature: self.temperature,
        })
    }
}

/// One sample; `timestamp` is local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: NaiveDateTime,
    pub ph: f64,
    pub tds: f64,
    pub turbidity: f64,
    pub temperature: f64,
}

impl SensorReading {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Ph => self.ph,
            Parameter::Tds => self.tds,
            Parameter::Turbidity => self.turbidity,
            Parameter::Temperature => self.temperature,
        }
    }
}

/// The four measured quantities, in column order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Ph,
    Tds,
    Turbidity,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Ph,
        Parameter::Tds,
        Parameter::Turbidity,
        Parameter::Temperature,
    ];

    /// Column / field name as it appears in JSON and CSV.
    pub fn column(self) -> &'static str {
        match self {
            Parameter::Ph => "ph",
            Parameter::Tds => "tds",
            Parameter::Turbidity => "turbidity",
            Parameter::Temperature => "temperature",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Parameter::Ph => "pH",
            Parameter::Tds => "TDS",
            Parameter::Turbidity => "Turbidity",
            Parameter::Temperature => "Temperature",
        }
    }

    /// Axis label including the unit.
    pub fn axis_label(self) -> &'static str {
        match self {
            Parameter::Ph => "pH",
            Parameter::Tds => "TDS (ppm)",
            Parameter::Turbidity => "Turbidity (NTU)",
            Parameter::Temperature => "Temperature (Celsius)",
        }
    }
}
