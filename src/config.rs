use std::collections::BTreeSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::models::{FINGERPRINT, MANUAL_ENTRY};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModeSet(BTreeSet<String>);

impl ModeSet {
    pub fn new<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(modes.into_iter().map(Into::into).collect())
    }

    pub fn fingerprint_only() -> Self {
        Self::new([FINGERPRINT])
    }

    pub fn fingerprint_or_manual() -> Self {
        Self::new([FINGERPRINT, MANUAL_ENTRY])
    }

    pub fn qualifies(&self, mode: &str) -> bool {
        self.0.contains(mode)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineConfig {
    pub percentage_modes: ModeSet,
    pub streak_modes: ModeSet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        ViewProfile::Admin.config()
    }
}

impl EngineConfig {
    // An override naming no modes at all is rejected.
    pub fn with_overrides(
        mut self,
        percentage_modes: &[String],
        streak_modes: &[String],
    ) -> Result<Self, LedgerError> {
        if !percentage_modes.is_empty() {
            self.percentage_modes = non_empty("percentage", percentage_modes)?;
        }
        if !streak_modes.is_empty() {
            self.streak_modes = non_empty("streak", streak_modes)?;
        }
        Ok(self)
    }
}

fn non_empty(which: &'static str, modes: &[String]) -> Result<ModeSet, LedgerError> {
    let set = ModeSet::new(
        modes
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string),
    );
    if set.is_empty() {
        return Err(LedgerError::EmptyModeSet(which));
    }
    Ok(set)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewProfile {
    #[default]
    Admin,
    Teacher,
    Student,
}

impl ViewProfile {
    pub fn config(self) -> EngineConfig {
        match self {
            ViewProfile::Admin => EngineConfig {
                percentage_modes: ModeSet::fingerprint_only(),
                streak_modes: ModeSet::fingerprint_only(),
            },
            ViewProfile::Teacher | ViewProfile::Student => EngineConfig {
                percentage_modes: ModeSet::fingerprint_or_manual(),
                streak_modes: ModeSet::fingerprint_only(),
            },
        }
    }
}
