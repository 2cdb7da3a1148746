//! Threshold-based anomaly selection.
//!
//! Each predicate picks out full readings independently; a reading can land
//! in both sets and repeated alarms are kept.

use crate::models::reading::SensorReading;

pub const DEFAULT_TURBIDITY_LIMIT_NTU: f64 = 2.0;
pub const DEFAULT_PH_MIN: f64 = 6.5;
pub const DEFAULT_PH_MAX: f64 = 8.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyLimits {
    /// Strictly above this is high turbidity.
    pub turbidity_ntu: f64,
    pub ph_min: f64,
    pub ph_max: f64,
}

impl Default for AnomalyLimits {
    fn default() -> Self {
        AnomalyLimits {
            turbidity_ntu: DEFAULT_TURBIDITY_LIMIT_NTU,
            ph_min: DEFAULT_PH_MIN,
            ph_max: DEFAULT_PH_MAX,
        }
    }
}

impl AnomalyLimits {
    pub fn is_high_turbidity(&self, reading: &SensorReading) -> bool {
        reading.turbidity > self.turbidity_ntu
    }

    pub fn is_unsafe_ph(&self, reading: &SensorReading) -> bool {
        reading.ph < self.ph_min || reading.ph > self.ph_max
    }

    pub fn high_turbidity(&self, readings: &[SensorReading]) -> Vec<SensorReading> {
        readings.iter().filter(|r| self.is_high_turbidity(r)).copied().collect()
    }

    pub fn unsafe_ph(&self, readings: &[SensorReading]) -> Vec<SensorReading> {
        readings.iter().filter(|r| self.is_unsafe_ph(r)).copied().collect()
    }
}
