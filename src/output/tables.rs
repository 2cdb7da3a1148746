//! CSV tables written to the output directory.
//!
//! Undefined values (NaN, `None`) are written as empty cells.

use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::analysis::daily::DailyExtreme;
use crate::analysis::session::{trend_columns, SessionMean, SessionTrendRow};
use crate::analysis::stats::{CorrelationMatrix, Summary};
use crate::models::reading::{Parameter, SensorReading};
use crate::timestamps::format_cell;

pub const BASIC_STATISTICS: &str = "basic_statistics.csv";
pub const DAILY_MAX: &str = "daily_max.csv";
pub const DAILY_MIN: &str = "daily_min.csv";
pub const HIGH_TURBIDITY: &str = "high_turbidity_anomalies.csv";
pub const UNSAFE_PH: &str = "unsafe_ph_anomalies.csv";
pub const CORRELATION_MATRIX: &str = "correlation_matrix.csv";
pub const DAILY_SESSION_MEAN: &str = "daily_session_mean.csv";
pub const SESSION_TRENDS: &str = "session_trends.csv";

fn open(path: &Path) -> Result<Writer<File>, String> {
    Writer::from_path(path).map_err(|e| format!("failed to create {}: {}", path.display(), e))
}

fn finish(mut writer: Writer<File>, path: &Path) -> Result<(), String> {
    writer.flush().map_err(|e| format!("failed to write {}: {}", path.display(), e))
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

fn parameter_header(first: &str) -> Vec<String> {
    std::iter::once(first.to_string())
        .chain(Parameter::ALL.iter().map(|p| p.column().to_string()))
        .collect()
}

/// Statistic names down the side, parameters across.
pub fn write_basic_statistics(path: &Path, summaries: &[Summary; 4]) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    w.write_record(parameter_header("")).map_err(err)?;
    let rows = summaries.each_ref().map(Summary::rows);
    for (i, name) in Summary::ROW_NAMES.iter().enumerate() {
        let mut record = vec![name.to_string()];
        record.extend(rows.iter().map(|r| cell(r[i])));
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

pub fn write_daily_extremes(path: &Path, rows: &[DailyExtreme]) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    let mut header = vec!["date".to_string(), "timestamp".to_string()];
    header.extend(Parameter::ALL.iter().map(|p| p.column().to_string()));
    w.write_record(&header).map_err(err)?;
    for row in rows {
        let mut record = vec![row.date.to_string(), format_cell(row.timestamp)];
        record.extend(Parameter::ALL.iter().map(|p| cell(Some(row.value(*p)))));
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

/// Full reading rows, unmodified, plus the derived date column.
pub fn write_readings(path: &Path, readings: &[SensorReading]) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    let mut header = parameter_header("timestamp");
    header.push("date".to_string());
    w.write_record(&header).map_err(err)?;
    for r in readings {
        let mut record = vec![format_cell(r.timestamp)];
        record.extend(Parameter::ALL.iter().map(|p| cell(Some(r.value(*p)))));
        record.push(r.date().to_string());
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

pub fn write_correlation_matrix(path: &Path, matrix: &CorrelationMatrix) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    w.write_record(parameter_header("")).map_err(err)?;
    for (parameter, row) in Parameter::ALL.iter().zip(matrix) {
        let mut record = vec![parameter.column().to_string()];
        record.extend(row.iter().map(|v| cell(*v)));
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

pub fn write_daily_session_means(path: &Path, means: &[SessionMean]) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    let mut header = vec!["date".to_string(), "session".to_string(), "count".to_string()];
    header.extend(Parameter::ALL.iter().map(|p| p.column().to_string()));
    w.write_record(&header).map_err(err)?;
    for m in means {
        let mut record = vec![m.date.to_string(), m.session.label().to_string(), m.count.to_string()];
        record.extend(Parameter::ALL.iter().map(|p| cell(Some(m.mean(*p)))));
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

pub fn write_session_trends(path: &Path, rows: &[SessionTrendRow]) -> Result<(), String> {
    let mut w = open(path)?;
    let err = |e: csv::Error| format!("failed to write {}: {}", path.display(), e);
    let columns = trend_columns();
    let header: Vec<&str> = std::iter::once("date")
        .chain(columns.iter().map(|(_, _, name)| name.as_str()))
        .collect();
    w.write_record(&header).map_err(err)?;
    for row in rows {
        let mut record = vec![row.date.to_string()];
        record.extend(columns.iter().map(|(s, p, _)| cell(row.get(*s, *p))));
        w.write_record(&record).map_err(err)?;
    }
    finish(w, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::session::{daily_session_means, session_trends};
    use crate::analysis::stats::{correlation_matrix, describe};
    use chrono::NaiveDate;
    use std::fs;

    fn readings() -> Vec<SensorReading> {
        (0..4)
            .map(|i| SensorReading {
                timestamp: NaiveDate::from_ymd_opt(2025, 4, 15)
                    .unwrap()
                    .and_hms_opt(7, i * 10, 0)
                    .unwrap(),
                ph: 7.0 + f64::from(i) * 0.1,
                tds: 300.0,
                turbidity: 1.0 + f64::from(i),
                temperature: 28.0,
            })
            .collect()
    }

    #[test]
    fn statistics_table_has_describe_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BASIC_STATISTICS);
        write_basic_statistics(&path, &describe(&readings())).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], ",ph,tds,turbidity,temperature");
        assert_eq!(lines[1], "count,4,4,4,4");
        assert!(lines[3].starts_with("std,"));
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn anomaly_rows_carry_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HIGH_TURBIDITY);
        write_readings(&path, &readings()[2..3]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "timestamp,ph,tds,turbidity,temperature,date\n2025-04-15 07:20:00,7.2,300,3,28,2025-04-15\n"
        );
    }

    #[test]
    fn undefined_correlations_are_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CORRELATION_MATRIX);
        write_correlation_matrix(&path, &correlation_matrix(&readings())).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let tds_row = text.lines().find(|l| l.starts_with("tds,")).unwrap();
        assert_eq!(tds_row, "tds,,,,");
    }

    #[test]
    fn session_tables_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let means = daily_session_means(&readings());
        let mean_path = dir.path().join(DAILY_SESSION_MEAN);
        write_daily_session_means(&mean_path, &means).unwrap();
        let text = fs::read_to_string(&mean_path).unwrap();
        assert!(text.starts_with("date,session,count,ph,tds,turbidity,temperature\n2025-04-15,Morning,4,"));

        let trend_path = dir.path().join(SESSION_TRENDS);
        write_session_trends(&trend_path, &session_trends(&means)).unwrap();
        let text = fs::read_to_string(&trend_path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("date,Morning_ph,Morning_tds"));
        let row = text.lines().nth(1).unwrap();
        // afternoon and evening columns stay empty
        assert!(row.ends_with(",,,,,,,,"), "{}", row);
    }
}
