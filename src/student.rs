use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::ModeSet;
use crate::error::LedgerError;
use crate::models::{percentage, AttendanceEvent};
use crate::normalize::parse_day;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub month: Option<String>,
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub percentage: f64,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub student_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub present: usize,
    pub absent: usize,
}

pub fn parse_month(raw: &str) -> Result<String, LedgerError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .ok()
        .filter(|_| raw.len() == 7)
        .map(|_| raw.to_string())
        .ok_or_else(|| LedgerError::InvalidMonth(raw.to_string()))
}

pub fn records_for<'a>(
    events: &'a [AttendanceEvent],
    student_id: &str,
) -> Vec<&'a AttendanceEvent> {
    events
        .iter()
        .filter(|event| event.student_id == student_id)
        .collect()
}

pub fn in_month<'a>(
    records: &[&'a AttendanceEvent],
    month: Option<&str>,
) -> Vec<&'a AttendanceEvent> {
    records
        .iter()
        .copied()
        .filter(|event| month.map_or(true, |m| event.date.starts_with(m)))
        .collect()
}

// Every record in the month counts as present, whatever its mode.
pub fn student_summary(
    events: &[AttendanceEvent],
    student_id: &str,
    month: Option<&str>,
) -> StudentSummary {
    let records = records_for(events, student_id);
    let total_days = records
        .iter()
        .map(|event| event.date.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let present_days = in_month(&records, month).len();
    let pct = percentage(present_days, total_days);

    StudentSummary {
        student_id: student_id.to_string(),
        month: month.map(str::to_string),
        total_days,
        present_days,
        absent_days: total_days.saturating_sub(present_days),
        percentage: pct,
        message: attendance_message(pct),
    }
}

// Sunday-started weeks counted from January 1st.
pub fn week_of_year(day: NaiveDate) -> u32 {
    let jan_first = NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day);
    let offset = jan_first.weekday().num_days_from_sunday();
    (day.ordinal0() + offset) / 7 + 1
}

pub fn weekly_summary(records: &[&AttendanceEvent]) -> BTreeMap<u32, usize> {
    let mut weeks = BTreeMap::new();
    for event in records {
        if let Some(day) = event.day() {
            *weeks.entry(week_of_year(day)).or_insert(0) += 1;
        }
    }
    weeks
}

// Weekends inside the window count as absent too.
pub fn range_summary(
    events: &[AttendanceEvent],
    student_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    present_modes: &ModeSet,
) -> RangeSummary {
    let present = records_for(events, student_id)
        .into_iter()
        .filter(|event| present_modes.qualifies(&event.mode))
        .filter_map(|event| parse_day(&event.date))
        .filter(|day| *day >= from && *day <= to)
        .count();
    let calendar_days = usize::try_from((to - from).num_days() + 1).unwrap_or(0);

    RangeSummary {
        student_id: student_id.to_string(),
        from,
        to,
        present,
        absent: calendar_days.saturating_sub(present),
    }
}

pub fn attendance_message(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "Excellent attendance! Keep up the great work!"
    } else if percentage >= 75.0 {
        "Good attendance, but there's room for improvement."
    } else if percentage > 0.0 {
        "Attendance is low; try to attend more classes."
    } else {
        "No attendance records available."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FINGERPRINT, MANUAL_ENTRY};

    fn event(date: &str, id: &str, mode: &str) -> AttendanceEvent {
        AttendanceEvent {
            date: date.to_string(),
            student_id: id.to_string(),
            student_name: "Kiara Patel".to_string(),
            time: "09:15".to_string(),
            mode: mode.to_string(),
            reason: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<AttendanceEvent> {
        vec![
            event("2024-01-30", "s1", FINGERPRINT),
            event("2024-01-31", "s1", MANUAL_ENTRY),
            event("2024-02-01", "s1", FINGERPRINT),
            event("2024-02-01", "s2", FINGERPRINT),
        ]
    }

    #[test]
    fn month_selector_validation() {
        assert_eq!(parse_month("2024-02").unwrap(), "2024-02");
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("2024-2").is_err());
        assert!(parse_month("February").is_err());
    }

    #[test]
    fn summary_counts_whole_history_against_month() {
        let all = student_summary(&sample(), "s1", None);
        assert_eq!((all.total_days, all.present_days, all.absent_days), (3, 3, 0));
        assert_eq!(all.message, "Excellent attendance! Keep up the great work!");

        let january = student_summary(&sample(), "s1", Some("2024-01"));
        assert_eq!((january.total_days, january.present_days, january.absent_days), (3, 2, 1));
        assert!((january.percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_student_has_empty_summary() {
        let summary = student_summary(&sample(), "nobody", None);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.percentage, 0.0);
        assert_eq!(summary.message, "No attendance records available.");
    }

    #[test]
    fn weeks_start_on_sunday() {
        // 2024-01-01 is a Monday.
        assert_eq!(week_of_year(day(2024, 1, 1)), 1);
        assert_eq!(week_of_year(day(2024, 1, 6)), 1);
        assert_eq!(week_of_year(day(2024, 1, 7)), 2);
        // 2023-01-01 is a Sunday.
        assert_eq!(week_of_year(day(2023, 1, 7)), 1);
        assert_eq!(week_of_year(day(2023, 1, 8)), 2);
    }

    #[test]
    fn weekly_summary_groups_every_record() {
        let events = sample();
        let records = records_for(&events, "s1");
        let weeks = weekly_summary(&records);
        assert_eq!(weeks.into_iter().collect::<Vec<_>>(), vec![(5, 3)]);
    }

    #[test]
    fn other_capture_modes_still_count_for_the_student() {
        let events = vec![
            event("2024-01-02", "s1", FINGERPRINT),
            event("2024-01-03", "s1", "Face"),
        ];
        let summary = student_summary(&events, "s1", None);
        assert_eq!((summary.total_days, summary.present_days, summary.absent_days), (2, 2, 0));

        let records = records_for(&events, "s1");
        assert_eq!(weekly_summary(&records).get(&1), Some(&2));
    }

    #[test]
    fn range_counts_calendar_days() {
        let summary = range_summary(
            &sample(),
            "s1",
            day(2024, 1, 29),
            day(2024, 2, 4),
            &ModeSet::fingerprint_only(),
        );
        assert_eq!((summary.present, summary.absent), (2, 5));

        let inverted = range_summary(
            &sample(),
            "s1",
            day(2024, 2, 4),
            day(2024, 1, 29),
            &ModeSet::fingerprint_only(),
        );
        assert_eq!((inverted.present, inverted.absent), (0, 0));
    }

    #[test]
    fn message_bands() {
        assert_eq!(attendance_message(90.0), "Excellent attendance! Keep up the great work!");
        assert_eq!(attendance_message(75.0), "Good attendance, but there's room for improvement.");
        assert_eq!(attendance_message(0.5), "Attendance is low; try to attend more classes.");
        assert_eq!(attendance_message(0.0), "No attendance records available.");
    }
}
