use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ViewProfile;
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub view: ViewProfile,
    pub dark_mode: bool,
}

pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences, LedgerError>;
    fn save(&self, prefs: &Preferences) -> Result<(), LedgerError>;
}

// A missing file reads as defaults.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, message: impl ToString) -> LedgerError {
        LedgerError::Preferences {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self) -> Result<Preferences, LedgerError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Preferences::default());
            }
            Err(err) => return Err(self.failure(err)),
        };
        serde_json::from_str(&raw).map_err(|err| self.failure(err))
    }

    fn save(&self, prefs: &Preferences) -> Result<(), LedgerError> {
        let body = serde_json::to_string_pretty(prefs).map_err(|err| self.failure(err))?;
        std::fs::write(&self.path, body).map_err(|err| self.failure(err))
    }
}
