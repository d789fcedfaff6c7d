use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::ModeSet;
use crate::models::{AttendanceEvent, HistoryEntry};
use crate::normalize::parse_day;

// Streaks are measured on the full event set, never a date-filtered one.
pub fn group_by_student(events: &[AttendanceEvent]) -> BTreeMap<String, Vec<HistoryEntry>> {
    let mut map: BTreeMap<String, Vec<HistoryEntry>> = BTreeMap::new();

    for event in events {
        map.entry(event.student_id.clone())
            .or_default()
            .push(HistoryEntry {
                date: event.date.clone(),
                mode: event.mode.clone(),
            });
    }

    for history in map.values_mut() {
        history.sort_by(|a, b| a.date.cmp(&b.date));
    }
    map
}

/// Consecutive-day run ending at the student's most recent record. The walk
/// goes newest to oldest and stops on a non-qualifying mode or a gap of more
/// than one day. A second record on an already counted day is skipped.
pub fn current_streak(history: &[HistoryEntry], modes: &ModeSet) -> usize {
    let mut sorted: Vec<&HistoryEntry> = history.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut streak = 0;
    let mut prev_day: Option<NaiveDate> = None;

    for entry in sorted {
        if !modes.qualifies(&entry.mode) {
            break;
        }
        let Some(day) = parse_day(&entry.date) else {
            tracing::warn!(date = %entry.date, "unparseable date ends streak walk");
            break;
        };

        match prev_day {
            None => streak = 1,
            Some(prev) => {
                let gap = (prev - day).num_days();
                if gap == 0 {
                    tracing::warn!(date = %entry.date, "duplicate same-day record skipped");
                    continue;
                }
                if gap != 1 {
                    break;
                }
                streak += 1;
            }
        }
        prev_day = Some(day);
    }
    streak
}

pub fn streaks(
    histories: &BTreeMap<String, Vec<HistoryEntry>>,
    modes: &ModeSet,
) -> BTreeMap<String, usize> {
    histories
        .iter()
        .map(|(id, history)| (id.clone(), current_streak(history, modes)))
        .collect()
}
