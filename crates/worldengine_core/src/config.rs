//! Engine settings model.
//!
//! # Responsibility
//! - Hold user-tunable engine settings loaded from JSON.
//! - Validate settings before the engine is constructed.
//!
//! # Invariants
//! - Every field has a default, so an empty object is a valid settings file.
//! - `current_date` always parses as a world date after `validate()`.

use crate::calendar::WorldDate;
use crate::data::DatasetKey;
use crate::logging::{default_log_level, parse_level, DEFAULT_KEEP_FILES, DEFAULT_MAX_FILE_MIB};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Metadata key whose value selects the note variant.
    #[serde(default = "default_discriminant_key")]
    pub discriminant_key: String,
    /// The world's "today", used for ages of living characters.
    #[serde(default = "default_current_date")]
    pub current_date: String,
    /// Area unit for nations that do not declare `geography.unit`.
    #[serde(default = "default_area_unit")]
    pub default_area_unit: String,
    /// Map used for `geography.size: MAP` when a nation names none.
    #[serde(default)]
    pub default_map: Option<String>,
    #[serde(default)]
    pub datasets: DatasetOverrides,
    /// Vault path prefixes that are never tracked.
    #[serde(default)]
    pub excluded_folders: Vec<String>,
    /// Allowed deviation of a distribution sum from 1.0 before warning.
    #[serde(default = "default_distribution_epsilon")]
    pub distribution_epsilon: f64,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            discriminant_key: default_discriminant_key(),
            current_date: default_current_date(),
            default_area_unit: default_area_unit(),
            default_map: None,
            datasets: DatasetOverrides::default(),
            excluded_folders: Vec::new(),
            distribution_epsilon: default_distribution_epsilon(),
            logging: LoggingSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|err| SettingsError::Malformed(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.discriminant_key.trim().is_empty() {
            return Err(SettingsError::EmptyDiscriminantKey);
        }
        self.current_world_date()?;
        if self.default_area_unit.trim().is_empty() {
            return Err(SettingsError::EmptyAreaUnit);
        }
        if !self.distribution_epsilon.is_finite() || self.distribution_epsilon < 0.0 {
            return Err(SettingsError::InvalidEpsilon(self.distribution_epsilon));
        }
        for key in DatasetKey::ALL {
            if let Some(path) = self.datasets.path_for(key) {
                if path.trim().is_empty() {
                    return Err(SettingsError::EmptyDatasetPath(key.as_str()));
                }
            }
        }
        parse_level(&self.logging.level).map_err(SettingsError::InvalidLogging)?;
        if self.logging.max_file_mib == 0 || self.logging.keep_files == 0 {
            return Err(SettingsError::InvalidLogging(
                "log rotation needs a non-zero file size and file count".to_string(),
            ));
        }
        Ok(())
    }

    pub fn current_world_date(&self) -> Result<WorldDate, SettingsError> {
        self.current_date
            .parse()
            .map_err(|_| SettingsError::InvalidCurrentDate(self.current_date.clone()))
    }

    /// Returns whether `path` falls under an excluded folder.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_folders.iter().any(|folder| {
            let folder = folder.trim().trim_end_matches('/');
            !folder.is_empty()
                && (path == folder || path.starts_with(&format!("{folder}/")))
        })
    }
}

/// Optional backing paths for user-overridden reference datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOverrides {
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub population_density: Option<String>,
    #[serde(default)]
    pub settlement_types: Option<String>,
    #[serde(default)]
    pub talent_ranks: Option<String>,
}

impl DatasetOverrides {
    pub fn path_for(&self, key: DatasetKey) -> Option<&str> {
        match key {
            DatasetKey::Units => self.units.as_deref(),
            DatasetKey::PopulationDensity => self.population_density.as_deref(),
            DatasetKey::SettlementTypes => self.settlement_types.as_deref(),
            DatasetKey::TalentRanks => self.talent_ranks.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute log directory; logging stays off when unset.
    #[serde(default)]
    pub dir: Option<String>,
    /// Size in MiB at which the active log file rolls over.
    #[serde(default = "default_max_file_mib")]
    pub max_file_mib: u64,
    /// Rolled-over files kept on disk.
    #[serde(default = "default_keep_files")]
    pub keep_files: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
            max_file_mib: default_max_file_mib(),
            keep_files: default_keep_files(),
        }
    }
}

fn default_discriminant_key() -> String {
    "noteType".to_string()
}

fn default_current_date() -> String {
    "1-1-1".to_string()
}

fn default_area_unit() -> String {
    "mile^2".to_string()
}

fn default_distribution_epsilon() -> f64 {
    0.001
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_max_file_mib() -> u64 {
    DEFAULT_MAX_FILE_MIB
}

fn default_keep_files() -> usize {
    DEFAULT_KEEP_FILES
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    Malformed(String),
    EmptyDiscriminantKey,
    InvalidCurrentDate(String),
    EmptyAreaUnit,
    InvalidEpsilon(f64),
    EmptyDatasetPath(&'static str),
    InvalidLogging(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "settings are malformed: {message}"),
            Self::EmptyDiscriminantKey => write!(f, "discriminant_key must not be empty"),
            Self::InvalidCurrentDate(value) => {
                write!(f, "current_date `{value}` is not a [-]YYYY-M-D date")
            }
            Self::EmptyAreaUnit => write!(f, "default_area_unit must not be empty"),
            Self::InvalidEpsilon(value) => {
                write!(f, "distribution_epsilon must be a non-negative number, got {value}")
            }
            Self::EmptyDatasetPath(key) => write!(f, "dataset override path for `{key}` is blank"),
            Self::InvalidLogging(message) => write!(f, "logging settings are invalid: {message}"),
        }
    }
}

impl Error for SettingsError {}
