use std::collections::BTreeMap;
use std::fmt::Write;

use crate::engine::DashboardView;
use crate::filter::EventFilter;
use crate::models::{AttendanceEvent, ReportMatrix, Roster};
use crate::student::StudentSummary;

pub const MATRIX_HEADER_LEAD: [&str; 2] = ["Roll No.", "Name"];
pub const MATRIX_HEADER_TAIL: [&str; 3] = ["Present Days", "Absent Days", "% Attendance"];

pub fn percentage_cell(matrix: &ReportMatrix, percentage: f64) -> String {
    if matrix.dates.is_empty() {
        "0%".to_string()
    } else {
        format!("{percentage:.2}%")
    }
}

pub fn matrix_records(matrix: &ReportMatrix) -> Vec<Vec<String>> {
    let mut header: Vec<String> = MATRIX_HEADER_LEAD.iter().map(|s| s.to_string()).collect();
    header.extend(matrix.dates.iter().cloned());
    header.extend(MATRIX_HEADER_TAIL.iter().map(|s| s.to_string()));

    let mut records = vec![header];
    for row in &matrix.rows {
        let mut record = vec![row.student_id.clone(), row.name.clone()];
        record.extend(
            matrix
                .dates
                .iter()
                .map(|date| row.presence_on(date).as_str().to_string()),
        );
        record.push(row.present_count.to_string());
        record.push(row.absent_count.to_string());
        record.push(percentage_cell(matrix, row.percentage));
        records.push(record);
    }
    records
}

pub fn write_matrix_csv<W: std::io::Write>(matrix: &ReportMatrix, out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for record in matrix_records(matrix) {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn matrix_csv(matrix: &ReportMatrix) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    write_matrix_csv(matrix, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn mode_mix(events: &[AttendanceEvent]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.mode.as_str()).or_insert(0) += 1;
    }
    let mut mix: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(mode, count)| (mode.to_string(), count))
        .collect();
    mix.sort_by(|a, b| b.1.cmp(&a.1));
    mix
}

fn describe_filter(filter: &EventFilter) -> String {
    let from = filter
        .range
        .from
        .map_or_else(|| "the beginning".to_string(), |d| d.to_string());
    let to = filter
        .range
        .to
        .map_or_else(|| "today".to_string(), |d| d.to_string());
    let mut label = format!("{from} to {to}, mode {}", filter.mode);
    if !filter.search.trim().is_empty() {
        let _ = write!(label, ", matching '{}'", filter.search.trim());
    }
    label
}

pub fn build_report(
    filter: &EventFilter,
    view: &DashboardView,
    roster: &Roster,
    streaks: &BTreeMap<String, usize>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} events across {} days)",
        describe_filter(filter),
        view.filtered.len(),
        view.matrix.dates.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Capture Modes");

    let mix = mode_mix(&view.filtered);
    if mix.is_empty() {
        let _ = writeln!(output, "No events recorded for this window.");
    } else {
        for (mode, count) in &mix {
            let _ = writeln!(output, "- {mode}: {count} events");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Turnout");

    if view.matrix.dates.is_empty() {
        let _ = writeln!(output, "No days in this window.");
    } else {
        let rows = view.matrix.rows.len();
        for (date, present) in view.matrix.dates.iter().zip(view.matrix.present_per_date()) {
            let _ = writeln!(output, "- {date}: {present}/{rows} present");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance by Student");

    let mut ranked: Vec<_> = view.stats.iter().collect();
    ranked.sort_by(|a, b| {
        b.1.percentage
            .partial_cmp(&a.1.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if ranked.is_empty() {
        let _ = writeln!(output, "No students on record.");
    } else {
        for (id, stats) in ranked {
            let name = roster.get(id).map(String::as_str).unwrap_or("N/A");
            let _ = writeln!(
                output,
                "- {} ({}): {}/{} present ({:.1}%)",
                name, id, stats.present, stats.total, stats.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Streaks");

    let mut leaders: Vec<_> = streaks.iter().filter(|(_, streak)| **streak > 0).collect();
    leaders.sort_by(|a, b| b.1.cmp(a.1));
    if leaders.is_empty() {
        let _ = writeln!(output, "No active streaks.");
    } else {
        for (id, streak) in leaders.iter().take(10) {
            let name = roster.get(*id).map(String::as_str).unwrap_or("N/A");
            let _ = writeln!(output, "- {name} ({id}): {streak} days");
        }
    }

    let mut notes: Vec<&AttendanceEvent> = view
        .filtered
        .iter()
        .filter(|event| event.reason.is_some())
        .collect();
    notes.sort_by(|a, b| b.date.cmp(&a.date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Manual Notes");

    if notes.is_empty() {
        let _ = writeln!(output, "No manual notes for this window.");
    } else {
        for event in notes.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                event.student_name,
                event.mode,
                event.date,
                event.reason.as_deref().unwrap_or_default()
            );
        }
    }

    output
}

pub fn build_student_report(records: &[&AttendanceEvent], summary: &StudentSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report: {}", summary.student_id);
    if let Some(month) = &summary.month {
        let _ = writeln!(output, "Month {month}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "| Date | Time | Mode | Name |");
    let _ = writeln!(output, "|------|------|------|------|");
    for event in records {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            event.date, event.time, event.mode, event.student_name
        );
    }
    if records.is_empty() {
        let _ = writeln!(output, "No attendance records found for the selected month.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Total Days: {}", summary.total_days);
    let _ = writeln!(output, "Present Days: {}", summary.present_days);
    let _ = writeln!(output, "Absent Days: {}", summary.absent_days);
    let _ = writeln!(output, "Attendance %: {:.1}%", summary.percentage);
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", summary.message);

    output
}
