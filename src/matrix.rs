use std::collections::{BTreeMap, BTreeSet};

use crate::config::ModeSet;
use crate::models::{percentage, AttendanceEvent, MatrixRow, Presence, ReportMatrix, Roster};

/// Columns are the distinct dates in `filtered`, sorted ascending. Every
/// student starts absent and flips to present on a date with a qualifying
/// event, at most once per date, so `absent_count` never goes negative.
pub fn build_matrix(
    filtered: &[AttendanceEvent],
    roster: &Roster,
    present_modes: &ModeSet,
) -> ReportMatrix {
    let dates: Vec<String> = filtered
        .iter()
        .map(|event| event.date.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let blank = || -> BTreeMap<String, Presence> {
        dates
            .iter()
            .map(|date| (date.clone(), Presence::Absent))
            .collect()
    };

    let mut rows: BTreeMap<String, (String, BTreeMap<String, Presence>, usize)> = roster
        .iter()
        .map(|(id, name)| (id.clone(), (name.clone(), blank(), 0)))
        .collect();

    for event in filtered {
        if !present_modes.qualifies(&event.mode) {
            continue;
        }
        let (_, cells, present) = rows
            .entry(event.student_id.clone())
            .or_insert_with(|| (event.student_name.clone(), blank(), 0));
        if let Some(cell) = cells.get_mut(&event.date) {
            if *cell == Presence::Absent {
                *cell = Presence::Present;
                *present += 1;
            }
        }
    }

    let days = dates.len();
    let rows: Vec<MatrixRow> = rows
        .into_iter()
        .map(|(student_id, (name, per_date_presence, present_count))| MatrixRow {
            student_id,
            name,
            per_date_presence,
            present_count,
            absent_count: days - present_count,
            percentage: percentage(present_count, days),
        })
        .collect();

    ReportMatrix { dates, rows }
}

impl ReportMatrix {
    pub fn row(&self, student_id: &str) -> Option<&MatrixRow> {
        self.rows.iter().find(|row| row.student_id == student_id)
    }

    pub fn present_per_date(&self) -> Vec<usize> {
        self.dates
            .iter()
            .map(|date| {
                self.rows
                    .iter()
                    .filter(|row| row.presence_on(date) == Presence::Present)
                    .count()
            })
            .collect()
    }
}
