use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::filter::EventFilter;
use crate::history::{group_by_student, streaks};
use crate::matrix::build_matrix;
use crate::models::{AttendanceEvent, AttendanceStats, ReportMatrix, Roster};
use crate::normalize::{merge_roster, normalize, roster_from_events};
use crate::stats::{attendance_stats, distinct_modes};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub filtered: Vec<AttendanceEvent>,
    pub stats: BTreeMap<String, AttendanceStats>,
    pub matrix: ReportMatrix,
}

#[derive(Debug, Clone, Default)]
struct SnapshotDerived {
    roster: Roster,
    modes: Vec<String>,
    streaks: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    revision: u64,
    filter: EventFilter,
    config: EngineConfig,
}

// Every push bumps the revision, which invalidates all cached projections.
pub struct Dashboard {
    config: EngineConfig,
    registered: Roster,
    events: Arc<Vec<AttendanceEvent>>,
    revision: u64,
    derived: Option<(u64, EngineConfig, Arc<SnapshotDerived>)>,
    last_view: Option<(ViewKey, Arc<DashboardView>)>,
    recomputations: usize,
}

impl Dashboard {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registered: Roster::new(),
            events: Arc::new(Vec::new()),
            revision: 0,
            derived: None,
            last_view: None,
            recomputations: 0,
        }
    }

    #[cfg(test)]
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn push_snapshot(&mut self, snapshot: Option<&Value>) {
        self.replace_events(normalize(snapshot));
    }

    pub fn replace_events(&mut self, events: Vec<AttendanceEvent>) {
        tracing::debug!(events = events.len(), revision = self.revision + 1, "snapshot replaced");
        self.events = Arc::new(events);
        self.revision += 1;
    }

    pub fn set_registered(&mut self, registered: Roster) {
        self.registered = registered;
        self.revision += 1;
    }

    pub fn events(&self) -> &[AttendanceEvent] {
        &self.events
    }

    #[cfg(test)]
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    pub fn roster(&mut self) -> Roster {
        self.snapshot_derived().roster.clone()
    }

    pub fn modes(&mut self) -> Vec<String> {
        self.snapshot_derived().modes.clone()
    }

    pub fn streak(&mut self, student_id: &str) -> usize {
        self.snapshot_derived()
            .streaks
            .get(student_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn streaks(&mut self) -> BTreeMap<String, usize> {
        self.snapshot_derived().streaks.clone()
    }

    pub fn view(&mut self, filter: &EventFilter) -> Arc<DashboardView> {
        let key = ViewKey {
            revision: self.revision,
            filter: filter.clone(),
            config: self.config.clone(),
        };
        if let Some((cached_key, view)) = &self.last_view {
            if *cached_key == key {
                tracing::debug!(revision = key.revision, "view cache hit");
                return Arc::clone(view);
            }
        }

        let derived = self.snapshot_derived();
        let filtered = filter.apply(&self.events);
        let view = Arc::new(DashboardView {
            stats: attendance_stats(&filtered, &derived.roster, &self.config.percentage_modes),
            matrix: build_matrix(&filtered, &derived.roster, &self.config.percentage_modes),
            filtered,
        });
        self.recomputations += 1;
        tracing::debug!(
            revision = key.revision,
            rows = view.filtered.len(),
            "view recomputed"
        );
        self.last_view = Some((key, Arc::clone(&view)));
        view
    }

    fn snapshot_derived(&mut self) -> Arc<SnapshotDerived> {
        if let Some((revision, config, derived)) = &self.derived {
            if *revision == self.revision && *config == self.config {
                return Arc::clone(derived);
            }
        }

        let roster = merge_roster(roster_from_events(&self.events), &self.registered);
        let derived = Arc::new(SnapshotDerived {
            roster,
            modes: distinct_modes(&self.events),
            streaks: streaks(&group_by_student(&self.events), &self.config.streak_modes),
        });
        self.derived = Some((self.revision, self.config.clone(), Arc::clone(&derived)));
        derived
    }
}
