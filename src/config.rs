//! Station configuration
//!
//! A station is set up from one JSON document naming the product's limit catalog, the variant table to
//! run, the default measurement timeout, and the lot ranges used to resolve the product revision:
//!
//! ```json
//! {
//!     "limits_path": "limits/ts3520_final.json",
//!     "table": "DATA_H",
//!     "timeout_ms": 2000,
//!     "lots": [["A1801AA", "A1812ZZ", "Rev3"], ["A1901AA", "A1912ZZ", "Rev4"]]
//! }
//! ```
//!
//! Limits may be given inline under `"limits"` instead of `"limits_path"`. [`StationConfig::open`]
//! checks everything up front; a station with any configuration error must not start testing.

use std::{
    path::{ Path, PathBuf },
    sync::Arc,
    time::Duration,
};
use serde::{ Deserialize, Serialize };
use tracing::info;
use crate::{
    error::ConfigError,
    lots::{ Revision, RevisionEntry },
    source::{ self, CatalogDocument },
    table::{ Catalog, LimitTable },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig
{
    /// Limit catalog file, relative paths taken from the working directory
    #[serde(default)]
    pub limits_path: Option<PathBuf>,

    /// Inline limit catalog. Ignored when `limits_path` is set
    #[serde(default)]
    pub limits: Option<CatalogDocument>,

    /// Variant table to run.
    /// Default: `DATA`
    #[serde(default = "default_table")]
    pub table: String,

    /// Default time allowed for one sensor reading.
    /// Default: 1000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Lot ranges and the revision built in each, first match wins
    #[serde(default)]
    pub lots: Vec<RevisionEntry>,
}

fn default_table() -> String
{
    source::DEFAULT_TABLE.to_string()
}

fn default_timeout_ms() -> u64
{
    1000
}

impl Default for StationConfig
{
    fn default() -> Self
    {
        Self {
            limits_path: None,
            limits: None,
            table: default_table(),
            timeout_ms: default_timeout_ms(),
            lots: Vec::new(),
        }
    }
}

/// Everything a test run needs, loaded and checked
#[derive(Debug, Clone)]
pub struct Station
{
    pub table: Arc<LimitTable>,
    pub revision: Revision,
    pub timeout: Duration,
}

impl StationConfig
{
    pub fn from_json(text: &str) -> Result<Self, ConfigError>
    {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError>
    {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Checks settings which need no file access
    pub fn validate(&self) -> Result<(), ConfigError>
    {
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidSetting("table name must not be empty".to_string()));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting("timeout_ms must be greater than zero".to_string()));
        }

        if self.limits_path.is_none() && self.limits.is_none() {
            return Err(ConfigError::InvalidSetting("one of limits_path or limits is required".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration
    {
        Duration::from_millis(self.timeout_ms)
    }

    /// Loads the whole limit catalog
    pub fn catalog(&self) -> Result<Catalog, ConfigError>
    {
        match (&self.limits_path, &self.limits) {
            (Some(path), _) => source::load_catalog(path),
            (None, Some(inline)) => inline.catalog(),
            (None, None) => Err(ConfigError::InvalidSetting("one of limits_path or limits is required".to_string())),
        }
    }

    /// Validates and loads everything, selecting the configured table
    pub fn open(&self) -> Result<Station, ConfigError>
    {
        self.validate()?;

        let table = self.catalog()?.select(&self.table)?;
        let revision = Revision::from_entries(&self.lots)?;

        info!(table = %self.table, limits = table.len(), lot_ranges = revision.len(), "station configured");

        Ok(Station {
            table: table,
            revision: revision,
            timeout: self.timeout(),
        })
    }
}
