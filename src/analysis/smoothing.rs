//! Trailing simple moving average over reading order.

use crate::models::reading::{Parameter, SensorReading};

pub const DEFAULT_WINDOW: usize = 10;

/// Output has the same length as `values`; the first `window - 1` positions
/// are `None` because the window is not yet full.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            // re-sum periodically so drift from the running total stays bounded
            if i % 1024 == 0 {
                sum = values[i + 1 - window..=i].iter().sum();
            }
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Smoothed series for every parameter, indexed like `Parameter::ALL`.
pub fn smooth_all(readings: &[SensorReading], window: usize) -> [Vec<Option<f64>>; 4] {
    Parameter::ALL.map(|p| {
        let values: Vec<f64> = readings.iter().map(|r| r.value(p)).collect();
        moving_average(&values, window)
    })
}
