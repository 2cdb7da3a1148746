//! PNG charts rendered with plotters.
//!
//! Text needs a TrueType font registered at runtime. When none can be loaded
//! the charts are still drawn, just without captions, tick labels or legends.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::analysis::session::{Session, SessionTrendRow};
use crate::analysis::stats::CorrelationMatrix;
use crate::models::reading::Parameter;

type PlotResult = Result<(), Box<dyn Error>>;

const SIZE: (u32, u32) = (1200, 600);
const FONT_FAMILY: &str = "sans-serif";
const TIMESTAMP_LABEL: &str = "%Y-%m-%d %H:%M:%S";

const GREY: RGBColor = RGBColor(128, 128, 128);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const ORANGE: RGBColor = RGBColor(230, 140, 0);

/// Font candidates tried when `PLOT_FONT_PATH` is unset.
const FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

static LABELS_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Register a font for chart text once per process. Returns whether text can
/// be drawn.
pub fn init_fonts(explicit: Option<&Path>) -> bool {
    *LABELS_AVAILABLE.get_or_init(|| {
        let candidates: Vec<PathBuf> = match explicit {
            Some(p) => vec![p.to_path_buf()],
            None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
        };
        let found = register_first_font(&candidates);
        if !found {
            warn!("Plots: no usable font found (set PLOT_FONT_PATH); charts will have no text");
        }
        found
    })
}

/// Register the first readable, parseable font among `candidates`.
fn register_first_font(candidates: &[PathBuf]) -> bool {
    for path in candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                debug!("Plots: using font {}", path.display());
                return true;
            }
            Err(_) => warn!("Plots: font {} is not a usable TrueType font", path.display()),
        }
    }
    false
}

fn labels() -> bool {
    LABELS_AVAILABLE.get().copied().unwrap_or(false)
}

pub fn parameter_color(parameter: Parameter) -> RGBColor {
    match parameter {
        Parameter::Ph => BLUE,
        Parameter::Tds => GREEN,
        Parameter::Turbidity => PURPLE,
        Parameter::Temperature => RED,
    }
}

fn session_color(session: Session) -> RGBColor {
    match session {
        Session::Morning => ORANGE,
        Session::Afternoon => RED,
        Session::Evening => BLUE,
        Session::OutsideSession => GREY,
    }
}

fn to_plot_err(path: &Path) -> impl Fn(Box<dyn Error>) -> String + '_ {
    move |e| format!("failed to render {}: {}", path.display(), e)
}

/// Padded y range over the finite values; `None` when there are none.
fn value_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if lo > hi {
        return None;
    }
    if lo == hi {
        return Some((lo - 1.0, hi + 1.0));
    }
    let pad = (hi - lo) * 0.05;
    Some((lo - pad, hi + pad))
}

fn x_range(timestamps: &[NaiveDateTime]) -> Option<(i64, i64)> {
    let first = timestamps.first()?.and_utc().timestamp();
    let last = timestamps.last()?.and_utc().timestamp();
    Some((first, last.max(first + 1)))
}

fn format_epoch(secs: &i64) -> String {
    DateTime::from_timestamp(*secs, 0)
        .map(|dt| dt.naive_utc().format(TIMESTAMP_LABEL).to_string())
        .unwrap_or_default()
}

/// Raw series for one parameter.
pub fn plot_series(path: &Path, parameter: Parameter, timestamps: &[NaiveDateTime], values: &[f64]) -> Result<(), String> {
    draw_series(path, parameter, timestamps, values, None).map_err(to_plot_err(path))
}

/// Raw series in grey with the moving average overlaid.
pub fn plot_smoothed(
    path: &Path,
    parameter: Parameter,
    timestamps: &[NaiveDateTime],
    values: &[f64],
    smoothed: &[Option<f64>],
) -> Result<(), String> {
    draw_series(path, parameter, timestamps, values, Some(smoothed)).map_err(to_plot_err(path))
}

fn draw_series(
    path: &Path,
    parameter: Parameter,
    timestamps: &[NaiveDateTime],
    values: &[f64],
    smoothed: Option<&[Option<f64>]>,
) -> PlotResult {
    let (x0, x1) = x_range(timestamps).ok_or("no readings to plot")?;
    let (y0, y1) = value_range(values).ok_or("no finite values to plot")?;
    let xs = || timestamps.iter().map(|t| t.and_utc().timestamp());
    let text = labels();

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if text {
        let title = match smoothed {
            Some(_) => format!("Smoothed {}", parameter.title()),
            None => format!("{} Over Time", parameter.title()),
        };
        builder
            .caption(title, (FONT_FAMILY, 26))
            .x_label_area_size(110)
            .y_label_area_size(70);
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

    let mut mesh = chart.configure_mesh();
    if text {
        mesh.x_desc("Timestamp")
            .y_desc(parameter.axis_label())
            .x_labels(5)
            .x_label_formatter(&format_epoch)
            .x_label_style((FONT_FAMILY, 13));
    }
    mesh.draw()?;

    match smoothed {
        None => {
            chart.draw_series(LineSeries::new(xs().zip(values.iter().copied()), &parameter_color(parameter)))?;
        }
        Some(smoothed) => {
            chart
                .draw_series(LineSeries::new(xs().zip(values.iter().copied()), &GREY.mix(0.5)))?
                .label("Original")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREY));

            // undefined leading positions are simply not drawn
            let defined = xs()
                .zip(smoothed.iter().copied())
                .filter_map(|(x, v)| v.map(|v| (x, v)));
            chart
                .draw_series(LineSeries::new(defined, BLUE.stroke_width(2)))?
                .label("Smoothed")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

            if text {
                chart
                    .configure_series_labels()
                    .background_style(&WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()?;
            }
        }
    }

    root.present()?;
    Ok(())
}

/// Diverging blue-white-red grid, one cell per parameter pair.
pub fn plot_correlation_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<(), String> {
    draw_heatmap(path, matrix).map_err(to_plot_err(path))
}

fn heat_color(r: Option<f64>) -> RGBColor {
    let Some(r) = r.filter(|v| v.is_finite()) else {
        return RGBColor(220, 220, 220);
    };
    let t = r.clamp(-1.0, 1.0);
    let fade = |c: f64| (255.0 - (255.0 - c) * t.abs()).round() as u8;
    if t >= 0.0 {
        RGBColor(fade(200.0), fade(30.0), fade(30.0))
    } else {
        RGBColor(fade(30.0), fade(60.0), fade(200.0))
    }
}

fn draw_heatmap(path: &Path, matrix: &CorrelationMatrix) -> PlotResult {
    let text = labels();
    let n = Parameter::ALL.len() as i32;

    let root = BitMapBackend::new(path, (800, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder
            .caption("Correlation Matrix", (FONT_FAMILY, 26))
            .x_label_area_size(50)
            .y_label_area_size(110);
    }
    let mut chart = builder.build_cartesian_2d(0..n, 0..n)?;

    // row i of the matrix is drawn at y = n - 1 - i so it reads like the CSV
    let row_y = move |i: i32| n - 1 - i;
    let name_at = |i: i32| {
        usize::try_from(i)
            .ok()
            .and_then(|i| Parameter::ALL.get(i))
            .map(|p| p.column().to_string())
            .unwrap_or_default()
    };
    let x_name = |x: &i32| name_at(*x);
    let y_name = |y: &i32| name_at(row_y(*y));
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh().disable_y_mesh();
    if text {
        mesh.x_labels(Parameter::ALL.len())
            .y_labels(Parameter::ALL.len())
            .x_label_formatter(&x_name)
            .y_label_formatter(&y_name);
    }
    mesh.draw()?;

    chart.draw_series((0..n).flat_map(|i| {
        (0..n).map(move |j| {
            let r = matrix[i as usize][j as usize];
            let y = row_y(i);
            Rectangle::new([(j, y), (j + 1, y + 1)], heat_color(r).filled())
        })
    }))?;

    if text {
        chart.draw_series((0..n).flat_map(|i| {
            (0..n).map(move |j| {
                let label = matrix[i as usize][j as usize]
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "n/a".to_string());
                Text::new(label, (j, row_y(i) + 1), (FONT_FAMILY, 20).into_font())
            })
        }))?;
    }

    root.present()?;
    Ok(())
}

/// One line per session across days for a single parameter.
pub fn plot_session_trend(path: &Path, parameter: Parameter, rows: &[SessionTrendRow]) -> Result<(), String> {
    draw_session_trend(path, parameter, rows).map_err(to_plot_err(path))
}

fn draw_session_trend(path: &Path, parameter: Parameter, rows: &[SessionTrendRow]) -> PlotResult {
    use chrono::Datelike;

    let first = rows.first().ok_or("no session data to plot")?.date.num_days_from_ce();
    let last = rows.last().ok_or("no session data to plot")?.date.num_days_from_ce();
    let values: Vec<f64> = rows
        .iter()
        .flat_map(|row| Session::ACTIVE.iter().filter_map(|s| row.get(*s, parameter)))
        .collect();
    let (y0, y1) = value_range(&values).ok_or("no finite values to plot")?;
    let text = labels();

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if text {
        builder
            .caption(format!("{} by Session", parameter.title()), (FONT_FAMILY, 26))
            .x_label_area_size(60)
            .y_label_area_size(70);
    }
    let mut chart = builder.build_cartesian_2d(first..last.max(first + 1), y0..y1)?;

    let day_label = |d: &i32| {
        NaiveDate::from_num_days_from_ce_opt(*d)
            .map(|d| d.to_string())
            .unwrap_or_default()
    };
    let mut mesh = chart.configure_mesh();
    if text {
        mesh.x_desc("Date")
            .y_desc(parameter.axis_label())
            .x_label_formatter(&day_label);
    }
    mesh.draw()?;

    for session in Session::ACTIVE {
        let color = session_color(session);
        let points: Vec<(i32, f64)> = rows
            .iter()
            .filter_map(|row| row.get(session, parameter).map(|v| (row.date.num_days_from_ce(), v)))
            .collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(session.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))?;
    }

    if text {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
