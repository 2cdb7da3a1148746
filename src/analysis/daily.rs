//! Per-calendar-day extremes.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::models::reading::{Parameter, SensorReading};

/// Column-wise extreme for one day: each field is reduced independently, so
/// the row generally does not correspond to any single reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyExtreme {
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    /// Indexed like `Parameter::ALL`.
    pub values: [f64; 4],
}

impl DailyExtreme {
    pub fn value(&self, parameter: Parameter) -> f64 {
        self.values[parameter as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

pub fn daily_extremes(readings: &[SensorReading], which: Extreme) -> Vec<DailyExtreme> {
    let mut days: BTreeMap<NaiveDate, DailyExtreme> = BTreeMap::new();
    for reading in readings {
        let values = Parameter::ALL.map(|p| reading.value(p));
        days.entry(reading.date())
            .and_modify(|row| {
                match which {
                    Extreme::Max => {
                        row.timestamp = row.timestamp.max(reading.timestamp);
                        for (acc, v) in row.values.iter_mut().zip(values) {
                            *acc = acc.max(v);
                        }
                    }
                    Extreme::Min => {
                        row.timestamp = row.timestamp.min(reading.timestamp);
                        for (acc, v) in row.values.iter_mut().zip(values) {
                            *acc = acc.min(v);
                        }
                    }
                }
            })
            .or_insert(DailyExtreme {
                date: reading.date(),
                timestamp: reading.timestamp,
                values,
            });
    }
    days.into_values().collect()
}
