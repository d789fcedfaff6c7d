use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::parse_day;

pub const NOT_AVAILABLE: &str = "N/A";
pub const FINGERPRINT: &str = "Fingerprint";
pub const MANUAL_ENTRY: &str = "Manual Entry";

pub type Roster = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub date: String,
    pub student_id: String,
    pub student_name: String,
    pub time: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AttendanceEvent {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Inclusive, day-granularity check against a raw event date. An
    /// unbounded range accepts every date, unparseable ones included; once
    /// either bound is set, a date that does not parse is rejected.
    pub fn contains(&self, date: &str) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(day) = parse_day(date) else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub mode: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub present: usize,
    pub total: usize,
    pub percentage: f64,
}

impl AttendanceStats {
    pub fn from_counts(present: usize, total: usize) -> Self {
        Self {
            present,
            total,
            percentage: percentage(present, total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Present => "P",
            Presence::Absent => "A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub student_id: String,
    pub name: String,
    pub per_date_presence: BTreeMap<String, Presence>,
    pub present_count: usize,
    pub absent_count: usize,
    pub percentage: f64,
}

impl MatrixRow {
    pub fn presence_on(&self, date: &str) -> Presence {
        self.per_date_presence
            .get(date)
            .copied()
            .unwrap_or(Presence::Absent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMatrix {
    pub dates: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::new(Some(day("2024-01-02")), Some(day("2024-01-04")));
        assert!(!range.contains("2024-01-01"));
        assert!(range.contains("2024-01-02"));
        assert!(range.contains("2024-01-04"));
        assert!(!range.contains("2024-01-05"));
    }

    #[test]
    fn open_ended_ranges() {
        let from_only = DateRange::new(Some(day("2024-03-01")), None);
        assert!(from_only.contains("2030-01-01"));
        assert!(!from_only.contains("2024-02-29"));

        let to_only = DateRange::new(None, Some(day("2024-03-01")));
        assert!(to_only.contains("1999-12-31"));
        assert!(!to_only.contains("2024-03-02"));
    }

    #[test]
    fn unparseable_dates_only_fail_bounded_ranges() {
        assert!(DateRange::default().contains("not-a-date"));
        let range = DateRange::new(Some(day("2024-01-01")), None);
        assert!(!range.contains("not-a-date"));
    }

    #[test]
    fn percentage_handles_empty_totals() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(AttendanceStats::from_counts(1, 3).present, 1);
    }
}
