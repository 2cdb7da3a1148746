//! Daily session buckets and the per-session aggregates built on them.

use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;

use crate::analysis::stats::mean;
use crate::models::reading::{Parameter, SensorReading};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Session {
    Morning,
    Afternoon,
    Evening,
    OutsideSession,
}

impl Session {
    /// Sessions that survive filtering, in chronological order.
    pub const ACTIVE: [Session; 3] = [Session::Morning, Session::Afternoon, Session::Evening];

    pub fn label(self) -> &'static str {
        match self {
            Session::Morning => "Morning",
            Session::Afternoon => "Afternoon",
            Session::Evening => "Evening",
            Session::OutsideSession => "Outside Session",
        }
    }

    /// Both window ends are inclusive: 08:00:00 is still Morning.
    pub fn classify(time: NaiveTime) -> Session {
        let within = |start_h: u32, end_h: u32| {
            let start = NaiveTime::from_hms_opt(start_h, 0, 0).unwrap_or(NaiveTime::MIN);
            let end = NaiveTime::from_hms_opt(end_h, 0, 0).unwrap_or(NaiveTime::MIN);
            time >= start && time <= end
        };
        if within(6, 8) {
            Session::Morning
        } else if within(12, 14) {
            Session::Afternoon
        } else if within(18, 20) {
            Session::Evening
        } else {
            Session::OutsideSession
        }
    }

    pub fn of(reading: &SensorReading) -> Session {
        Session::classify(reading.time_of_day())
    }
}

/// Keep in-session readings; returns them along with the dropped count.
pub fn drop_outside_session(readings: Vec<SensorReading>) -> (Vec<SensorReading>, usize) {
    let before = readings.len();
    let kept: Vec<_> = readings
        .into_iter()
        .filter(|r| Session::of(r) != Session::OutsideSession)
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionMean {
    pub date: NaiveDate,
    pub session: Session,
    pub count: usize,
    /// Indexed like `Parameter::ALL`.
    pub means: [f64; 4],
}

impl SessionMean {
    pub fn mean(&self, parameter: Parameter) -> f64 {
        self.means[parameter as usize]
    }
}

/// Mean of every parameter per (date, session), ordered by date then session.
/// Outside-session readings never form a group.
pub fn daily_session_means(readings: &[SensorReading]) -> Vec<SessionMean> {
    let mut groups: BTreeMap<(NaiveDate, Session), Vec<&SensorReading>> = BTreeMap::new();
    for reading in readings {
        let session = Session::of(reading);
        if session == Session::OutsideSession {
            continue;
        }
        groups.entry((reading.date(), session)).or_default().push(reading);
    }

    groups
        .into_iter()
        .map(|((date, session), members)| {
            let means = Parameter::ALL.map(|p| {
                let values: Vec<f64> = members.iter().map(|r| r.value(p)).collect();
                mean(&values).unwrap_or(f64::NAN)
            });
            SessionMean {
                date,
                session,
                count: members.len(),
                means,
            }
        })
        .collect()
}

/// One row of the session pivot: per-date means keyed by (session, parameter).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTrendRow {
    pub date: NaiveDate,
    pub values: BTreeMap<(Session, Parameter), f64>,
}

impl SessionTrendRow {
    pub fn get(&self, session: Session, parameter: Parameter) -> Option<f64> {
        self.values.get(&(session, parameter)).copied()
    }
}

/// Column names of the pivot, e.g. `Morning_ph`, in output order.
pub fn trend_columns() -> Vec<(Session, Parameter, String)> {
    let mut cols = Vec::with_capacity(Session::ACTIVE.len() * Parameter::ALL.len());
    for session in Session::ACTIVE {
        for parameter in Parameter::ALL {
            cols.push((session, parameter, format!("{}_{}", session.label(), parameter.column())));
        }
    }
    cols
}

pub fn session_trends(means: &[SessionMean]) -> Vec<SessionTrendRow> {
    let mut rows: BTreeMap<NaiveDate, BTreeMap<(Session, Parameter), f64>> = BTreeMap::new();
    for m in means {
        let row = rows.entry(m.date).or_default();
        for parameter in Parameter::ALL {
            row.insert((m.session, parameter), m.mean(parameter));
        }
    }
    rows.into_iter()
        .map(|(date, values)| SessionTrendRow { date, values })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn reading(day: u32, h: u32, m: u32, ph: f64) -> SensorReading {
        SensorReading {
            timestamp: NaiveDate::from_ymd_opt(2025, 4, day).unwrap().and_hms_opt(h, m, 0).unwrap(),
            ph,
            tds: 300.0,
            turbidity: 1.0,
            temperature: 28.0,
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        assert_eq!(Session::classify(at(6, 0, 0)), Session::Morning);
        assert_eq!(Session::classify(at(7, 59, 59)), Session::Morning);
        assert_eq!(Session::classify(at(8, 0, 0)), Session::Morning);
        assert_eq!(Session::classify(at(8, 0, 1)), Session::OutsideSession);
        assert_eq!(Session::classify(at(5, 59, 59)), Session::OutsideSession);

        assert_eq!(Session::classify(at(12, 0, 0)), Session::Afternoon);
        assert_eq!(Session::classify(at(14, 0, 0)), Session::Afternoon);
        assert_eq!(Session::classify(at(14, 0, 1)), Session::OutsideSession);

        assert_eq!(Session::classify(at(18, 0, 0)), Session::Evening);
        assert_eq!(Session::classify(at(20, 0, 0)), Session::Evening);
        assert_eq!(Session::classify(at(23, 30, 0)), Session::OutsideSession);
        assert_eq!(Session::classify(at(0, 0, 0)), Session::OutsideSession);
    }

    #[test]
    fn every_minute_of_the_day_gets_exactly_the_expected_label() {
        for minute in 0..(24 * 60) {
            let t = at(minute / 60, minute % 60, 0);
            let expected = match minute {
                360..=480 => Session::Morning,
                720..=840 => Session::Afternoon,
                1080..=1200 => Session::Evening,
                _ => Session::OutsideSession,
            };
            assert_eq!(Session::classify(t), expected, "at {}", t);
        }
    }

    #[test]
    fn dropping_outside_readings_counts_them() {
        let readings = vec![reading(1, 7, 0, 7.0), reading(1, 9, 0, 7.0), reading(1, 19, 0, 7.0)];
        let (kept, dropped) = drop_outside_session(readings);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn session_means_group_by_date_then_session() {
        let readings = vec![
            reading(2, 13, 0, 7.0),
            reading(1, 7, 0, 6.0),
            reading(1, 7, 30, 8.0),
            reading(1, 3, 0, 1.0),
            reading(1, 19, 0, 7.5),
        ];
        let means = daily_session_means(&readings);
        let keys: Vec<_> = means.iter().map(|m| (m.date.to_string(), m.session)).collect();
        assert_eq!(
            keys,
            vec![
                ("2025-04-01".to_string(), Session::Morning),
                ("2025-04-01".to_string(), Session::Evening),
                ("2025-04-02".to_string(), Session::Afternoon),
            ]
        );
        assert_eq!(means[0].count, 2);
        assert!((means[0].mean(Parameter::Ph) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn trends_pivot_leaves_missing_sessions_empty() {
        let readings = vec![reading(1, 7, 0, 6.0), reading(2, 13, 0, 7.0)];
        let rows = session_trends(&daily_session_means(&readings));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(Session::Morning, Parameter::Ph), Some(6.0));
        assert_eq!(rows[0].get(Session::Afternoon, Parameter::Ph), None);
        assert_eq!(rows[1].get(Session::Afternoon, Parameter::Ph), Some(7.0));

        let cols = trend_columns();
        assert_eq!(cols.len(), 12);
        assert_eq!(cols[0].2, "Morning_ph");
        assert_eq!(cols[11].2, "Evening_temperature");
    }
}
