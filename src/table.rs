//! Limit tables and per-product catalogs of them
//!
//! A table is read-only once built. Records are handed out as [`Arc`]s so any number of measurements
//! can hold on to the same limit without copying it or locking the table.

use std::{
    collections::{ BTreeMap, HashMap },
    sync::Arc,
};
use tracing::{ debug, info };
use crate::{
    error::{ ConfigError, LookupError },
    limit::{ Criterion, Limit },
};

/// Name of the record a table uses to opt into operator notifications
pub const NOTIFY: &str = "Notify";

/// A uniquely-keyed collection of limits
#[derive(Debug, Clone, Default)]
pub struct LimitTable
{
    records: Vec<Arc<Limit>>,
    index: HashMap<String, usize>,
}

impl LimitTable
{
    /// Builds a table, rejecting duplicate names
    pub fn build<I>(records: I) -> Result<Self, ConfigError>
        where I: IntoIterator<Item = Limit>
    {
        let mut table = Self::default();

        for record in records {
            if table.index.contains_key(record.name()) {
                return Err(ConfigError::DuplicateName(record.name().to_string()));
            }

            debug!(limit = %record, "adding limit");
            table.index.insert(record.name().to_string(), table.records.len());
            table.records.push(Arc::new(record));
        }

        Ok(table)
    }

    /// Looks up a limit by name
    pub fn get(&self, name: &str) -> Result<Arc<Limit>, LookupError>
    {
        self.index
            .get(name)
            .map(|index| Arc::clone(&self.records[*index]))
            .ok_or_else(|| LookupError::UnknownLimit(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.index.contains_key(name)
    }

    /// Limits in the order they were given
    pub fn iter(&self) -> impl Iterator<Item = &Limit>
    {
        self.records.iter().map(|record| record.as_ref())
    }

    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty()
    }

    /// Whether the table asks for passing measurements to be surfaced to the operator
    ///
    /// True only when a boolean record named `Notify` is present and set.
    pub fn notify(&self) -> bool
    {
        match self.get(NOTIFY) {
            Ok(record) => match record.criterion() {
                Criterion::Boolean { flag } => *flag,
                _ => false,
            },
            Err(_) => false,
        }
    }
}

/// The named variant tables of one product, e.g. `DATA`, `DATA_H`, `DATA20`
#[derive(Debug, Clone, Default)]
pub struct Catalog
{
    tables: BTreeMap<String, Arc<LimitTable>>,
}

impl Catalog
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Adds a variant table. Registering the same variant twice is a configuration error
    pub fn insert(&mut self, name: &str, table: LimitTable) -> Result<(), ConfigError>
    {
        if self.tables.contains_key(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }

        info!(table = name, limits = table.len(), "limit table loaded");
        self.tables.insert(name.to_string(), Arc::new(table));

        Ok(())
    }

    /// Picks the table a run will use
    pub fn select(&self, name: &str) -> Result<Arc<LimitTable>, ConfigError>
    {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTable(name.to_string()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str>
    {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize
    {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.tables.is_empty()
    }
}
