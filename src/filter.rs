use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{AttendanceEvent, DateRange};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeSelector {
    #[default]
    All,
    Only(String),
}

impl ModeSelector {
    pub fn matches(&self, mode: &str) -> bool {
        match self {
            ModeSelector::All => true,
            ModeSelector::Only(wanted) => wanted == mode,
        }
    }
}

impl FromStr for ModeSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "all" {
            ModeSelector::All
        } else {
            ModeSelector::Only(s.to_string())
        })
    }
}

impl fmt::Display for ModeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSelector::All => f.write_str("all"),
            ModeSelector::Only(mode) => f.write_str(mode),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    pub search: String,
    pub mode: ModeSelector,
    pub range: DateRange,
}

impl EventFilter {
    pub fn new(search: impl Into<String>, mode: ModeSelector, range: DateRange) -> Self {
        Self {
            search: search.into(),
            mode,
            range,
        }
    }

    pub fn matches(&self, event: &AttendanceEvent) -> bool {
        let term = self.search.trim().to_lowercase();
        let search_hit = term.is_empty()
            || event.student_name.to_lowercase().contains(&term)
            || event.student_id.to_lowercase().contains(&term);

        search_hit && self.mode.matches(&event.mode) && self.range.contains(&event.date)
    }

    pub fn apply(&self, events: &[AttendanceEvent]) -> Vec<AttendanceEvent> {
        events
            .iter()
            .filter(|event| self.matches(event))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn event(date: &str, id: &str, name: &str, mode: &str) -> AttendanceEvent {
        AttendanceEvent {
            date: date.to_string(),
            student_id: id.to_string(),
            student_name: name.to_string(),
            time: "09:00".to_string(),
            mode: mode.to_string(),
            reason: None,
        }
    }

    fn sample() -> Vec<AttendanceEvent> {
        vec![
            event("2024-01-01", "CS-101", "Avery Lee", "Fingerprint"),
            event("2024-01-02", "CS-102", "Jules Moreno", "Manual Entry"),
            event("2024-01-03", "CS-101", "Avery Lee", "Fingerprint"),
            event("garbage", "CS-103", "Kiara Patel", "Fingerprint"),
        ]
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let filter = EventFilter::new("  avery ", ModeSelector::All, DateRange::default());
        assert_eq!(filter.apply(&sample()).len(), 2);

        let by_id = EventFilter::new("cs-102", ModeSelector::All, DateRange::default());
        let hits = by_id.apply(&sample());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].student_name, "Jules Moreno");
    }

    #[test]
    fn mode_selector_is_exact() {
        let filter = EventFilter::new("", "Manual Entry".parse().unwrap(), DateRange::default());
        assert_eq!(filter.apply(&sample()).len(), 1);

        let partial = EventFilter::new("", "Manual".parse().unwrap(), DateRange::default());
        assert!(partial.apply(&sample()).is_empty());
        assert_eq!("all".parse::<ModeSelector>().unwrap(), ModeSelector::All);
    }

    #[test]
    fn date_range_drops_unparseable_dates() {
        let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 2), None);
        let filter = EventFilter::new("", ModeSelector::All, range);
        let dates: Vec<String> = filter.apply(&sample()).into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let range = DateRange::new(None, NaiveDate::from_ymd_opt(2024, 1, 1));
        let filter = EventFilter::new("avery", "Fingerprint".parse().unwrap(), range);
        let hits = filter.apply(&sample());
        assert_eq!(hits.len(), 1);
        assert!(filter.matches(&hits[0]));
    }

    fn event_strategy() -> impl Strategy<Value = AttendanceEvent> {
        (
            prop_oneof![Just("2024-01-01"), Just("2024-01-15"), Just("2024-02-01"), Just("bad")],
            "[a-c]{1,2}",
            "[A-Za-z ]{0,6}",
            prop_oneof![Just("Fingerprint"), Just("Manual Entry"), Just("N/A")],
        )
            .prop_map(|(date, id, name, mode)| event(date, &id, &name, mode))
    }

    fn filter_strategy() -> impl Strategy<Value = EventFilter> {
        (
            "[a-cA-C ]{0,3}",
            prop_oneof![
                Just(ModeSelector::All),
                Just(ModeSelector::Only("Fingerprint".into())),
            ],
            prop::option::of(prop_oneof![Just((2024, 1, 1)), Just((2024, 1, 20))]),
            prop::option::of(prop_oneof![Just((2024, 1, 15)), Just((2024, 3, 1))]),
        )
            .prop_map(|(search, mode, from, to)| {
                let day = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d);
                EventFilter::new(search, mode, DateRange::new(from.and_then(day), to.and_then(day)))
            })
    }

    proptest! {
        #[test]
        fn empty_filter_is_identity(events in prop::collection::vec(event_strategy(), 0..20)) {
            prop_assert_eq!(EventFilter::default().apply(&events), events);
        }

        #[test]
        fn filtering_is_idempotent(
            events in prop::collection::vec(event_strategy(), 0..20),
            filter in filter_strategy(),
        ) {
            let once = filter.apply(&events);
            prop_assert_eq!(filter.apply(&once), once);
        }
    }
}
