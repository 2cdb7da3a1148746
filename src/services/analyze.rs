//! Offline analysis of a JSON snapshot: summary tables, anomaly extracts,
//! smoothing and plots, plus the per-session breakdown when requested.

use log::{info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::anomaly::AnomalyLimits;
use crate::analysis::daily::{daily_extremes, Extreme};
use crate::analysis::session::{daily_session_means, drop_outside_session, session_trends};
use crate::analysis::smoothing::smooth_all;
use crate::analysis::stats::{column, correlation_matrix, describe, CorrelationMatrix};
use crate::models::reading::{Parameter, SensorReading};
use crate::output::report::{self, ReportSummary};
use crate::output::{plots, tables};
use crate::services::snapshot::load_readings;
use crate::timestamps::TimestampPolicy;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub sessions: bool,
    pub timestamps: TimestampPolicy,
    pub limits: AnomalyLimits,
    pub smoothing_window: usize,
    pub plots_enabled: bool,
    pub font_path: Option<PathBuf>,
}

pub fn run(opts: &AnalysisOptions) -> Result<ReportSummary, String> {
    let readings = load_readings(&opts.input, &opts.timestamps)?;
    info!("Analyze: loaded {} reading(s) from {}", readings.len(), opts.input.display());

    let (readings, dropped) = if opts.sessions {
        let (kept, dropped) = drop_outside_session(readings);
        info!("Analyze: dropped {} outside-session reading(s), {} remain", dropped, kept.len());
        (kept, Some(dropped))
    } else {
        (readings, None)
    };
    if readings.is_empty() {
        return Err(format!("no readings to analyse in {}", opts.input.display()));
    }

    let out = opts.output_dir.as_path();
    fs::create_dir_all(out).map_err(|e| format!("failed to create {}: {}", out.display(), e))?;

    let summaries = describe(&readings);
    tables::write_basic_statistics(&out.join(tables::BASIC_STATISTICS), &summaries)?;
    tables::write_daily_extremes(&out.join(tables::DAILY_MAX), &daily_extremes(&readings, Extreme::Max))?;
    let daily_min = daily_extremes(&readings, Extreme::Min);
    tables::write_daily_extremes(&out.join(tables::DAILY_MIN), &daily_min)?;
    info!("Analyze: statistics written for {} day(s)", daily_min.len());

    let high_turbidity = opts.limits.high_turbidity(&readings);
    let unsafe_ph = opts.limits.unsafe_ph(&readings);
    tables::write_readings(&out.join(tables::HIGH_TURBIDITY), &high_turbidity)?;
    tables::write_readings(&out.join(tables::UNSAFE_PH), &unsafe_ph)?;
    info!(
        "Analyze: {} high-turbidity and {} unsafe-pH reading(s)",
        high_turbidity.len(),
        unsafe_ph.len()
    );

    let matrix = correlation_matrix(&readings);
    tables::write_correlation_matrix(&out.join(tables::CORRELATION_MATRIX), &matrix)?;
    warn_undefined_correlations(&matrix);

    let session_rows = if opts.sessions {
        let means = daily_session_means(&readings);
        let trends = session_trends(&means);
        tables::write_daily_session_means(&out.join(tables::DAILY_SESSION_MEAN), &means)?;
        tables::write_session_trends(&out.join(tables::SESSION_TRENDS), &trends)?;
        info!("Analyze: {} session mean row(s) over {} day(s)", means.len(), trends.len());
        trends
    } else {
        Vec::new()
    };

    let mut plots_written = 0;
    if !opts.plots_enabled {
        info!("Analyze: plots disabled via PLOTS_ENABLED=false");
    } else if readings.len() < 2 {
        warn!("Analyze: only {} reading(s); skipping plots", readings.len());
    } else {
        plots::init_fonts(opts.font_path.as_deref());
        plots_written += write_series_plots(out, &readings, &matrix, opts.smoothing_window)?;
        if !session_rows.is_empty() {
            for parameter in Parameter::ALL {
                let path = out.join(format!("session_trend_{}.png", parameter.column()));
                plots::plot_session_trend(&path, parameter, &session_rows)?;
                plots_written += 1;
            }
        }
        info!("Analyze: {} plot(s) written", plots_written);
    }

    let days: BTreeSet<_> = readings.iter().map(SensorReading::date).collect();
    let summary = ReportSummary {
        reading_count: readings.len(),
        first: readings.first().map(|r| r.timestamp),
        last: readings.last().map(|r| r.timestamp),
        day_count: days.len(),
        high_turbidity_count: high_turbidity.len(),
        unsafe_ph_count: unsafe_ph.len(),
        limits: opts.limits,
        smoothing_window: opts.smoothing_window,
        plots_written,
        outside_session_dropped: dropped,
    };
    report::write(out, &summary)?;
    info!("Analyze: report written to {}", out.join(report::REPORT_FILE).display());
    Ok(summary)
}

fn write_series_plots(
    out: &Path,
    readings: &[SensorReading],
    matrix: &CorrelationMatrix,
    window: usize,
) -> Result<usize, String> {
    let timestamps: Vec<_> = readings.iter().map(|r| r.timestamp).collect();
    let smoothed = smooth_all(readings, window);
    let mut written = 0;

    for (parameter, smoothed) in Parameter::ALL.into_iter().zip(&smoothed) {
        let values = column(readings, parameter);
        let raw_path = out.join(format!("{}_over_time.png", parameter.column()));
        plots::plot_series(&raw_path, parameter, &timestamps, &values)?;
        let smoothed_path = out.join(format!("smoothed_{}.png", parameter.column()));
        plots::plot_smoothed(&smoothed_path, parameter, &timestamps, &values, smoothed)?;
        written += 2;
    }

    plots::plot_correlation_heatmap(&out.join("correlation_heatmap.png"), matrix)?;
    Ok(written + 1)
}

fn warn_undefined_correlations(matrix: &CorrelationMatrix) {
    for (i, row) in matrix.iter().enumerate() {
        for (j, r) in row.iter().enumerate().skip(i) {
            if r.is_none() {
                warn!(
                    "Analyze: correlation {} / {} undefined (constant column)",
                    Parameter::ALL[i].column(),
                    Parameter::ALL[j].column()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reading::{ReadingDocument, TimestampField};
    use crate::services::snapshot::write_json;

    fn doc(ts: &str, ph: f64, turbidity: f64) -> ReadingDocument {
        ReadingDocument {
            timestamp: TimestampField::Text(ts.to_string()),
            ph,
            tds: 310.0,
            turbidity,
            temperature: 28.0,
        }
    }

    fn options(dir: &Path, sessions: bool) -> AnalysisOptions {
        AnalysisOptions {
            input: dir.join("collected_data.json"),
            output_dir: dir.join("out"),
            sessions,
            timestamps: TimestampPolicy::default(),
            limits: AnomalyLimits::default(),
            smoothing_window: 10,
            plots_enabled: false,
            font_path: None,
        }
    }

    fn sample() -> Vec<ReadingDocument> {
        vec![
            doc("2025-04-15T07:00:00", 7.1, 1.0),
            doc("2025-04-15T09:30:00", 9.0, 1.2),
            doc("2025-04-15T13:00:00", 7.3, 2.5),
            doc("2025-04-16T19:00:00", 6.0, 0.8),
        ]
    }

    #[test]
    fn writes_every_table_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), false);
        write_json(&opts.input, &sample()).unwrap();

        let summary = run(&opts).unwrap();
        assert_eq!(summary.reading_count, 4);
        assert_eq!(summary.day_count, 2);
        assert_eq!(summary.high_turbidity_count, 1);
        assert_eq!(summary.unsafe_ph_count, 2);
        assert_eq!(summary.outside_session_dropped, None);

        for name in [
            tables::BASIC_STATISTICS,
            tables::DAILY_MAX,
            tables::DAILY_MIN,
            tables::HIGH_TURBIDITY,
            tables::UNSAFE_PH,
            tables::CORRELATION_MATRIX,
            report::REPORT_FILE,
        ] {
            assert!(opts.output_dir.join(name).is_file(), "missing {}", name);
        }
        assert!(!opts.output_dir.join(tables::SESSION_TRENDS).exists());
    }

    #[test]
    fn session_mode_drops_outside_readings() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), true);
        write_json(&opts.input, &sample()).unwrap();

        let summary = run(&opts).unwrap();
        assert_eq!(summary.reading_count, 3);
        assert_eq!(summary.outside_session_dropped, Some(1));
        // the 09:30 pH 9.0 reading is gone
        assert_eq!(summary.unsafe_ph_count, 1);
        assert!(opts.output_dir.join(tables::DAILY_SESSION_MEAN).is_file());
        assert!(opts.output_dir.join(tables::SESSION_TRENDS).is_file());
    }

    #[test]
    fn session_run_renders_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let opts = AnalysisOptions {
            plots_enabled: true,
            ..options(dir.path(), true)
        };
        write_json(&opts.input, &sample()).unwrap();

        let summary = run(&opts).unwrap();
        let mut expected: Vec<String> = Vec::new();
        for parameter in Parameter::ALL {
            expected.push(format!("{}_over_time.png", parameter.column()));
            expected.push(format!("smoothed_{}.png", parameter.column()));
            expected.push(format!("session_trend_{}.png", parameter.column()));
        }
        expected.push("correlation_heatmap.png".to_string());

        assert_eq!(summary.plots_written, 13);
        for name in &expected {
            let bytes = fs::read(opts.output_dir.join(name)).unwrap();
            assert_eq!(&bytes[1..4], b"PNG", "{}", name);
        }
        let report = fs::read_to_string(opts.output_dir.join(report::REPORT_FILE)).unwrap();
        assert!(report.contains("Plots (both original and smoothed, window of 10 readings)"));
    }

    #[test]
    fn single_reading_skips_plots() {
        let dir = tempfile::tempdir().unwrap();
        let opts = AnalysisOptions {
            plots_enabled: true,
            ..options(dir.path(), false)
        };
        write_json(&opts.input, &[doc("2025-04-15T07:00:00", 7.1, 1.0)]).unwrap();

        let summary = run(&opts).unwrap();
        assert_eq!(summary.plots_written, 0);
        assert!(!opts.output_dir.join("ph_over_time.png").exists());
        assert!(!opts.output_dir.join("correlation_heatmap.png").exists());
        assert!(opts.output_dir.join(tables::BASIC_STATISTICS).is_file());
        let report = fs::read_to_string(opts.output_dir.join(report::REPORT_FILE)).unwrap();
        assert!(report.contains("Plots were not generated for this run."), "{}", report);
    }

    #[test]
    fn anomaly_rows_follow_timestamp_order() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), false);
        write_json(
            &opts.input,
            &[
                doc("2025-04-16T10:00:00", 9.1, 1.0),
                doc("2025-04-15T10:00:00", 5.9, 1.0),
                doc("2025-04-15T10:00:00", 6.1, 1.0),
                doc("2025-04-15T11:00:00", 7.0, 1.0),
            ],
        )
        .unwrap();

        run(&opts).unwrap();
        let text = fs::read_to_string(opts.output_dir.join(tables::UNSAFE_PH)).unwrap();
        let stamps_and_ph: Vec<_> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').take(2).collect::<Vec<_>>().join(","))
            .collect();
        assert_eq!(
            stamps_and_ph,
            vec![
                "2025-04-15 10:00:00,5.9",
                "2025-04-15 10:00:00,6.1",
                "2025-04-16 10:00:00,9.1",
            ]
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), true);
        write_json(&opts.input, &[doc("2025-04-15T03:00:00", 7.0, 1.0)]).unwrap();
        let err = run(&opts).unwrap_err();
        assert!(err.contains("no readings"), "{}", err);
    }
}
