//! Run configuration loaded from `dbmigrate.json` and overridden by CLI flags

use crate::error::{MigrationError, Result};
use crate::{DEFAULT_COMMENT_WIDTH, DEFAULT_OMIT_LENGTH, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "dbmigrate.json";

/// Settings applied to every DuckDB connection when it is opened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckDbSettings {
    pub memory_limit: Option<String>,
    pub threads: Option<usize>,
}

/// Which kinds of DML statements to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmlTypes {
    pub insert: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for DmlTypes {
    fn default() -> Self {
        Self {
            insert: true,
            update: true,
            delete: true,
        }
    }
}

/// Defaults for a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(rename = "where")]
    pub conditions: Vec<String>,
    pub ignore: Vec<String>,
    pub dml_types: DmlTypes,
    pub include_views: bool,
    pub page_size: usize,
    pub comment_width: usize,
    pub omit_length: usize,
    pub duckdb: DuckDbSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            conditions: Vec::new(),
            ignore: Vec::new(),
            dml_types: DmlTypes::default(),
            include_views: true,
            page_size: DEFAULT_PAGE_SIZE,
            comment_width: DEFAULT_COMMENT_WIDTH,
            omit_length: DEFAULT_OMIT_LENGTH,
            duckdb: DuckDbSettings::default(),
        }
    }
}

impl RunConfig {
    /// Load the given file, or `dbmigrate.json` from the current directory
    /// when no path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE_NAME), false),
        };

        if !path.exists() {
            if explicit {
                return Err(MigrationError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: RunConfig = serde_json::from_str(&content).map_err(|e| {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            MigrationError::InvalidConfig { path: path.clone() }
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(MigrationError::config("page_size must be greater than 0"));
        }
        if self.comment_width < 4 {
            return Err(MigrationError::config("comment_width must be at least 4"));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
