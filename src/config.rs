use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dynamodb::FilterCondition;

const CONFIG_DIR: &str = ".cirrus";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dynamodb: DynamoPreferences,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamoPreferences {
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_column_preferences: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter_condition_preferences: BTreeMap<String, Vec<FilterCondition>>,
}

// Older files store never-written sections as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Preferences {
    pub fn table_columns(&self, table: &str) -> Option<&[String]> {
        self.dynamodb
            .table_column_preferences
            .get(table)
            .map(Vec::as_slice)
    }

    pub fn set_table_columns(&mut self, table: &str, columns: Vec<String>) {
        self.dynamodb
            .table_column_preferences
            .insert(table.to_string(), columns);
    }

    pub fn filter_conditions(&self, table: &str) -> &[FilterCondition] {
        self.dynamodb
            .filter_condition_preferences
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_filter_conditions(&mut self, table: &str, conditions: Vec<FilterCondition>) {
        self.dynamodb
            .filter_condition_preferences
            .insert(table.to_string(), conditions);
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NoHomeDir,
    Io { path: PathBuf, source: io::Error },
    Malformed { path: PathBuf, source: serde_json::Error },
    Encode(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoHomeDir => write!(f, "could not determine the home directory"),
            ConfigError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            ConfigError::Malformed { path, source } => {
                write!(f, "{} is not a valid preferences file: {source}", path.display())
            }
            ConfigError::Encode(source) => write!(f, "could not encode preferences: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NoHomeDir => None,
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Malformed { source, .. } | ConfigError::Encode(source) => Some(source),
        }
    }
}

/// Preferences persisted as one JSON document, rewritten whole on every
/// save. There is no locking; the last writer wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// `~/.cirrus/config.json`
    pub fn default_location() -> Result<Self, ConfigError> {
        let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::at(base_dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields default preferences; an unreadable or malformed
    /// one is an error.
    pub fn load(&self) -> Result<Preferences, ConfigError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No preferences file yet");
                return Ok(Preferences::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&data).map_err(|source| ConfigError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, preferences: &Preferences) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_string_pretty(preferences).map_err(ConfigError::Encode)?;
        fs::write(&self.path, data).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}
