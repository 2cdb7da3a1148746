//! Synthetic reservoir dataset for exercising the pipeline without a live
//! sensor node. Output uses the timestamp form the importer expects.

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::Path;

use crate::models::reading::{ReadingDocument, TimestampField};
use crate::services::snapshot::write_json;
use crate::timestamps::TimestampPolicy;

#[derive(Debug, Clone, Copy)]
pub struct GeneratorSettings {
    pub days: u32,
    pub step_secs: u32,
    pub seed: u64,
}

pub fn run(path: &Path, settings: GeneratorSettings, policy: &TimestampPolicy) -> Result<usize, String> {
    let end = align_to_minute(policy.to_local(Utc::now()));
    let start = window_start(end, settings.days)?;
    info!(
        "Fake data: generating readings from {} to {} every {}s (seed={:#x})",
        start, end, settings.step_secs, settings.seed
    );

    let docs = generate(start, end, settings);
    write_json(path, &docs)?;
    info!("Fake data: wrote {} reading(s) to {}", docs.len(), path.display());
    Ok(docs.len())
}

/// Readings on `[start, end)` at the configured cadence; deterministic for a
/// given seed.
pub fn generate(start: NaiveDateTime, end: NaiveDateTime, settings: GeneratorSettings) -> Vec<ReadingDocument> {
    let step = Duration::seconds(i64::from(settings.step_secs.max(1)));
    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let mut docs = Vec::new();

    let mut ph_drift: f64 = 0.0;
    let mut turbidity_event: u32 = 0;
    let mut ts = start;
    let mut last_logged_day = None;

    while ts < end {
        if last_logged_day != Some(ts.date()) {
            info!("Fake data: processing {}", ts.date());
            last_logged_day = Some(ts.date());
        }

        let day_fraction = f64::from(ts.num_seconds_from_midnight()) / 86_400.0;

        // slow random walk, pulled back toward neutral
        ph_drift = (ph_drift * 0.995 + rng.random_range(-0.01..=0.01)).clamp(-0.6, 0.6);
        if turbidity_event == 0 && rng.random_bool(0.002) {
            turbidity_event = rng.random_range(5..=30);
        }

        let temperature = compute_temperature(day_fraction, &mut rng);
        let ph = compute_ph(ph_drift, day_fraction, &mut rng);
        let tds = compute_tds(temperature, &mut rng);
        let turbidity = compute_turbidity(turbidity_event > 0, &mut rng);
        turbidity_event = turbidity_event.saturating_sub(1);

        docs.push(ReadingDocument {
            timestamp: TimestampField::Text(ts.format("%Y-%m-%dT%H:%M:%S").to_string()),
            ph: round_to(ph, 2),
            tds: round_to(tds, 1),
            turbidity: round_to(turbidity, 2),
            temperature: round_to(temperature, 2),
        });

        ts += step;
    }

    docs
}

fn window_start(end: NaiveDateTime, days: u32) -> Result<NaiveDateTime, String> {
    Duration::try_days(i64::from(days))
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| format!("cannot generate {} day(s) of data before {}", days, end))
}

fn align_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(ts)
}

fn compute_temperature(day_fraction: f64, rng: &mut SmallRng) -> f64 {
    // warmest mid-afternoon
    let diurnal = ((day_fraction - 0.375) * 2.0 * PI).sin() * 2.5;
    let noise: f64 = rng.random_range(-0.3..=0.3);
    (28.0 + diurnal + noise).clamp(20.0, 36.0)
}

fn compute_ph(drift: f64, day_fraction: f64, rng: &mut SmallRng) -> f64 {
    // photosynthesis raises pH through daylight hours
    let daylight = gaussian(day_fraction, 0.6, 0.12) * 0.25;
    let noise: f64 = rng.random_range(-0.05..=0.05);
    let excursion = if rng.random_bool(0.003) {
        if rng.random_bool(0.5) {
            rng.random_range(1.6..=2.4)
        } else {
            -rng.random_range(1.6..=2.2)
        }
    } else {
        0.0
    };
    (7.3 + drift + daylight + noise + excursion).clamp(4.0, 10.5)
}

fn compute_tds(temperature: f64, rng: &mut SmallRng) -> f64 {
    // conductivity-based sensors read higher in warm water
    let compensation = 1.0 + 0.02 * (temperature - 25.0);
    let noise: f64 = rng.random_range(-6.0..=6.0);
    (310.0 * compensation + noise).clamp(50.0, 900.0)
}

fn compute_turbidity(event: bool, rng: &mut SmallRng) -> f64 {
    let base: f64 = rng.random_range(0.3..=1.4);
    let spike = if event { rng.random_range(1.5..=6.0) } else { 0.0 };
    (base + spike).clamp(0.0, 50.0)
}

fn gaussian(x: f64, center: f64, width: f64) -> f64 {
    let exponent = -((x - center) * (x - center)) / (2.0 * width * width);
    exponent.exp()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::anomaly::AnomalyLimits;
    use crate::services::snapshot::to_readings;
    use chrono::NaiveDate;

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            days: 3,
            step_secs: 60,
            seed: 42,
        }
    }

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (start, start + Duration::days(3))
    }

    #[test]
    fn same_seed_gives_same_dataset() {
        let (start, end) = window();
        let a = generate(start, end, settings());
        let b = generate(start, end, settings());
        assert_eq!(a, b);
        assert_eq!(a.len(), 3 * 24 * 60);
    }

    #[test]
    fn output_parses_as_ordered_readings_in_range() {
        let (start, end) = window();
        let docs = generate(start, end, settings());
        let readings = to_readings(&docs, &TimestampPolicy::default()).unwrap();
        assert_eq!(readings.first().unwrap().timestamp, start);
        assert!(readings.last().unwrap().timestamp < end);
        for r in &readings {
            assert!((4.0..=10.5).contains(&r.ph));
            assert!((0.3..=7.4).contains(&r.turbidity), "{}", r.turbidity);
            assert!((20.0..=36.0).contains(&r.temperature));
        }
    }

    #[test]
    fn oversized_window_is_an_error_not_a_panic() {
        let (_, end) = window();
        assert_eq!(window_start(end, 3).unwrap(), window().0);
        let err = window_start(end, 200_000_000).unwrap_err();
        assert!(err.contains("200000000 day(s)"), "{}", err);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.json");
        let huge = GeneratorSettings {
            days: 200_000_000,
            ..settings()
        };
        assert!(run(&path, huge, &TimestampPolicy::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn dataset_contains_some_anomalies() {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let docs = generate(start, start + Duration::days(7), GeneratorSettings { days: 7, ..settings() });
        let readings = to_readings(&docs, &TimestampPolicy::default()).unwrap();
        let limits = AnomalyLimits::default();
        assert!(!limits.high_turbidity(&readings).is_empty());
        assert!(!limits.unsafe_ph(&readings).is_empty());
        assert!(limits.high_turbidity(&readings).len() < readings.len() / 10);
    }
}
