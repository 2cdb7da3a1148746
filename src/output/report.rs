//! Plain-text summary written at the end of an analysis run.

use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

use crate::analysis::anomaly::AnomalyLimits;
use crate::output::tables;
use crate::timestamps::format_cell;

pub const REPORT_FILE: &str = "final_report.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub reading_count: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub day_count: usize,
    pub high_turbidity_count: usize,
    pub unsafe_ph_count: usize,
    pub limits: AnomalyLimits,
    pub smoothing_window: usize,
    pub plots_written: usize,
    /// `Some(dropped)` for the session-aware variant.
    pub outside_session_dropped: Option<usize>,
}

pub fn render(summary: &ReportSummary) -> String {
    let limits = &summary.limits;
    let mut items: Vec<String> = vec![
        format!("Basic Statistics (Mean, STD, Min, Max) saved in '{}'.", tables::BASIC_STATISTICS),
        format!("Daily Maximum Values saved in '{}'.", tables::DAILY_MAX),
        format!("Daily Minimum Values saved in '{}'.", tables::DAILY_MIN),
        format!(
            "High Turbidity Events (>{} NTU) saved in '{}'.",
            limits.turbidity_ntu,
            tables::HIGH_TURBIDITY
        ),
        format!(
            "Unsafe pH Events (pH <{} or >{}) saved in '{}'.",
            limits.ph_min,
            limits.ph_max,
            tables::UNSAFE_PH
        ),
        format!("Correlation Matrix saved in '{}'.", tables::CORRELATION_MATRIX),
    ];
    if summary.outside_session_dropped.is_some() {
        items.push(format!("Daily Session Means saved in '{}'.", tables::DAILY_SESSION_MEAN));
        items.push(format!("Session Trends saved in '{}'.", tables::SESSION_TRENDS));
    }
    if summary.plots_written > 0 {
        items.push(format!(
            "Plots (both original and smoothed, window of {} readings) saved as PNG images.",
            summary.smoothing_window
        ));
    } else {
        items.push("Plots were not generated for this run.".to_string());
    }

    let mut lines = vec![
        "Smart Water Quality Monitoring System - Data Analysis Report".to_string(),
        String::new(),
    ];
    lines.extend(items.iter().enumerate().map(|(i, item)| format!("{}. {}", i + 1, item)));

    lines.push(String::new());
    lines.push("Dataset".to_string());
    lines.push(format!("  Readings analysed:    {}", summary.reading_count));
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        lines.push(format!("  Period:               {} to {}", format_cell(first), format_cell(last)));
    }
    lines.push(format!("  Days covered:         {}", summary.day_count));
    if let Some(dropped) = summary.outside_session_dropped {
        lines.push(format!("  Outside-session rows: {} (excluded)", dropped));
    }
    lines.push(format!("  High turbidity rows:  {}", summary.high_turbidity_count));
    lines.push(format!("  Unsafe pH rows:       {}", summary.unsafe_ph_count));

    lines.push(String::new());
    lines.push("This analysis helps to visualize the trends, detect unsafe water conditions,".to_string());
    lines.push("and understand interdependencies between various water quality parameters.".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn write(dir: &Path, summary: &ReportSummary) -> Result<(), String> {
    let path = dir.join(REPORT_FILE);
    fs::write(&path, render(summary)).map_err(|e| format!("failed to write {}: {}", path.display(), e))
}
