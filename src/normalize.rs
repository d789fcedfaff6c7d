use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{AttendanceEvent, Roster, NOT_AVAILABLE};

// Parts not shaped like the store yield no events rather than an error.
pub fn normalize(snapshot: Option<&Value>) -> Vec<AttendanceEvent> {
    let Some(Value::Object(dates)) = snapshot else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for (date, entries) in dates {
        let Value::Object(entries) = entries else {
            continue;
        };
        for (student_id, details) in entries {
            events.push(AttendanceEvent {
                date: date.clone(),
                student_id: student_id.clone(),
                student_name: display_field(details, "name"),
                time: display_field(details, "time"),
                mode: display_field(details, "mode"),
                reason: text_field(details, "reason"),
            });
        }
    }
    events
}

fn text_field(details: &Value, key: &str) -> Option<String> {
    match details.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display_field(details: &Value, key: &str) -> String {
    text_field(details, key).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// `YYYY-MM-DD`, optionally followed by `T...` or a space and a time.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    let rest = &raw[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub fn roster_from_events(events: &[AttendanceEvent]) -> Roster {
    let mut roster = Roster::new();
    for event in events {
        roster
            .entry(event.student_id.clone())
            .or_insert_with(|| event.student_name.clone());
    }
    roster
}

// Names already known from events win.
pub fn merge_roster(mut roster: Roster, registered: &Roster) -> Roster {
    for (id, name) in registered {
        roster.entry(id.clone()).or_insert_with(|| name.clone());
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_in_snapshot_order() {
        let snapshot = json!({
            "2024-01-02": {
                "s2": {"name": "Bo", "time": "09:01", "mode": "Fingerprint"},
                "s1": {"name": "Al", "time": "09:05", "mode": "Manual Entry", "reason": "Device down"}
            },
            "2024-01-01": {
                "s1": {"name": "Al", "time": "08:59", "mode": "Fingerprint"}
            }
        });

        let events = normalize(Some(&snapshot));
        let keys: Vec<(&str, &str)> = events
            .iter()
            .map(|e| (e.date.as_str(), e.student_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("2024-01-02", "s2"), ("2024-01-02", "s1"), ("2024-01-01", "s1")]
        );
        assert_eq!(events[1].reason.as_deref(), Some("Device down"));
        assert_eq!(events[0].reason, None);
    }

    #[test]
    fn missing_fields_default_to_not_available() {
        let snapshot = json!({"2024-01-01": {"s1": {}, "s2": null, "s3": {"name": ""}}});
        let events = normalize(Some(&snapshot));
        assert_eq!(events.len(), 3);
        for event in &events {
            assert_eq!(event.student_name, "N/A");
            assert_eq!(event.time, "N/A");
            assert_eq!(event.mode, "N/A");
            assert_eq!(event.reason, None);
        }
    }

    #[test]
    fn absent_or_malformed_roots_are_empty() {
        assert!(normalize(None).is_empty());
        assert!(normalize(Some(&Value::Null)).is_empty());
        assert!(normalize(Some(&json!([1, 2, 3]))).is_empty());
        assert!(normalize(Some(&json!({"2024-01-01": null}))).is_empty());
    }

    #[test]
    fn parses_days_with_or_without_time() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29);
        assert_eq!(parse_day("2024-02-29"), expected);
        assert_eq!(parse_day("2024-02-29T23:59:59.999Z"), expected);
        assert_eq!(parse_day("2024-02-29 10:00"), expected);
        assert_eq!(parse_day("2023-02-29"), None);
        assert_eq!(parse_day("2024-02-2"), None);
        assert_eq!(parse_day("2024-02-290"), None);
        assert_eq!(parse_day("N/A"), None);
    }

    #[test]
    fn roster_keeps_first_name_and_adds_registered() {
        let snapshot = json!({
            "2024-01-01": {"s1": {"name": "Al"}},
            "2024-01-02": {"s1": {"name": "Alfred"}}
        });
        let roster = roster_from_events(&normalize(Some(&snapshot)));
        assert_eq!(roster.get("s1").map(String::as_str), Some("Al"));

        let mut registered = Roster::new();
        registered.insert("s1".into(), "Ignored".into());
        registered.insert("s9".into(), "New Student".into());
        let merged = merge_roster(roster, &registered);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["s1"], "Al");
        assert_eq!(merged["s9"], "New Student");
    }
}
