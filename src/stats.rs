use std::collections::{BTreeMap, HashSet};

use crate::config::ModeSet;
use crate::models::{AttendanceEvent, AttendanceStats, Roster};

// Ids missing from the roster still get counted under their own id.
pub fn attendance_stats(
    filtered: &[AttendanceEvent],
    roster: &Roster,
    present_modes: &ModeSet,
) -> BTreeMap<String, AttendanceStats> {
    let mut counts: BTreeMap<String, (usize, usize)> =
        roster.keys().map(|id| (id.clone(), (0, 0))).collect();

    for event in filtered {
        let entry = counts.entry(event.student_id.clone()).or_insert((0, 0));
        if present_modes.qualifies(&event.mode) {
            entry.0 += 1;
        }
        entry.1 += 1;
    }

    counts
        .into_iter()
        .map(|(id, (present, total))| (id, AttendanceStats::from_counts(present, total)))
        .collect()
}

pub fn distinct_modes(events: &[AttendanceEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|event| seen.insert(event.mode.as_str()))
        .map(|event| event.mode.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FINGERPRINT, MANUAL_ENTRY};

    fn event(date: &str, id: &str, mode: &str) -> AttendanceEvent {
        AttendanceEvent {
            date: date.to_string(),
            student_id: id.to_string(),
            student_name: format!("Student {id}"),
            time: "08:30".to_string(),
            mode: mode.to_string(),
            reason: None,
        }
    }

    fn roster(ids: &[&str]) -> Roster {
        ids.iter()
            .map(|id| (id.to_string(), format!("Student {id}")))
            .collect()
    }

    #[test]
    fn three_of_four_is_seventy_five_percent() {
        let events = vec![
            event("2024-01-01", "s1", FINGERPRINT),
            event("2024-01-02", "s1", FINGERPRINT),
            event("2024-01-03", "s1", MANUAL_ENTRY),
            event("2024-01-04", "s1", FINGERPRINT),
        ];
        let stats = attendance_stats(&events, &roster(&["s1"]), &ModeSet::fingerprint_only());
        assert_eq!(stats["s1"].present, 3);
        assert_eq!(stats["s1"].total, 4);
        assert!((stats["s1"].percentage - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn permissive_modes_count_manual_entries() {
        let events = vec![
            event("2024-01-01", "s1", FINGERPRINT),
            event("2024-01-02", "s1", MANUAL_ENTRY),
        ];
        let strict = attendance_stats(&events, &roster(&["s1"]), &ModeSet::fingerprint_only());
        let permissive =
            attendance_stats(&events, &roster(&["s1"]), &ModeSet::fingerprint_or_manual());
        assert_eq!(strict["s1"].present, 1);
        assert_eq!(permissive["s1"].present, 2);
        assert_eq!(permissive["s1"].percentage, 100.0);
    }

    #[test]
    fn roster_students_without_events_are_zero() {
        let events = vec![event("2024-01-01", "s1", FINGERPRINT)];
        let stats = attendance_stats(&events, &roster(&["s1", "s2"]), &ModeSet::fingerprint_only());
        assert_eq!(stats["s2"], AttendanceStats::default());
    }

    #[test]
    fn unknown_ids_are_still_counted() {
        let events = vec![event("2024-01-01", "ghost", FINGERPRINT)];
        let stats = attendance_stats(&events, &Roster::new(), &ModeSet::fingerprint_only());
        assert_eq!(stats["ghost"].total, 1);
    }

    #[test]
    fn modes_are_deduplicated_in_first_seen_order() {
        let events = vec![
            event("2024-01-01", "s1", MANUAL_ENTRY),
            event("2024-01-01", "s2", FINGERPRINT),
            event("2024-01-02", "s1", MANUAL_ENTRY),
            event("2024-01-02", "s2", "N/A"),
        ];
        assert_eq!(distinct_modes(&events), vec![MANUAL_ENTRY, FINGERPRINT, "N/A"]);
    }
}
