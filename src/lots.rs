//! Lot number to product revision resolution
//!
//! Lot numbers are fixed width (`[AS]NNNNXX`: a site letter, a four digit year and week, and a two
//! character suffix) and issued in chronological order, so comparing them as strings orders them in
//! time. Everything here relies on that. The width is enforced on every lot that enters, and
//! everything is compared upper-cased.

use std::sync::LazyLock;
use regex::Regex;
use serde::{ Deserialize, Serialize };
use crate::error::{ ConfigError, LookupError };

static LOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[AS][0-9]{4}[0-9A-Z]{2}$").expect("lot pattern is a valid regex")
});

/// Whether `lot` is a well-formed lot number, in either case
pub fn is_valid_lot(lot: &str) -> bool
{
    LOT_PATTERN.is_match(lot)
}

fn normalise(lot: &str) -> Option<String>
{
    if is_valid_lot(lot) {
        Some(lot.to_ascii_uppercase())
    }
    else {
        None
    }
}

/// An inclusive range of lot numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotRange
{
    start: String,
    end: String,
}

impl LotRange
{
    /// Creates a range. Without an `end`, the range holds only `start`
    pub fn new(start: &str, end: Option<&str>) -> Result<Self, ConfigError>
    {
        let start_norm = normalise(start).ok_or_else(|| ConfigError::InvalidLot(start.to_string()))?;
        let end_norm = match end {
            Some(end) => normalise(end).ok_or_else(|| ConfigError::InvalidLot(end.to_string()))?,
            None => start_norm.clone(),
        };

        if end_norm < start_norm {
            return Err(ConfigError::InvalidLotRange { start: start_norm, end: end_norm });
        }

        Ok(Self {
            start: start_norm,
            end: end_norm,
        })
    }

    pub fn start(&self) -> &str
    {
        &self.start
    }

    pub fn end(&self) -> &str
    {
        &self.end
    }

    /// Whether `lot` falls within the range, endpoints included
    pub fn contains(&self, lot: &str) -> Result<bool, LookupError>
    {
        let lot = normalise(lot).ok_or_else(|| LookupError::InvalidLot(lot.to_string()))?;

        Ok(self.start <= lot && lot <= self.end)
    }
}

/// One entry of a revision source: `[start, end or null, revision]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry(pub String, pub Option<String>, pub String);

/// Ordered lot ranges, each naming the product revision built in it
#[derive(Debug, Clone, Default)]
pub struct Revision
{
    entries: Vec<(LotRange, String)>,
}

impl Revision
{
    pub fn new(entries: Vec<(LotRange, String)>) -> Self
    {
        Self { entries: entries }
    }

    /// Loads entries written as `[["A1801AA", "A1812ZZ", "Rev3"], ["A1901AA", null, "Rev4"]]`
    pub fn from_json(text: &str) -> Result<Self, ConfigError>
    {
        let raw: Vec<RevisionEntry> = serde_json::from_str(text)?;
        Self::from_entries(&raw)
    }

    pub fn from_entries(entries: &[RevisionEntry]) -> Result<Self, ConfigError>
    {
        Self::from_triples(entries.iter().map(|entry| (entry.0.as_str(), entry.1.as_deref(), entry.2.as_str())))
    }

    /// Builds a resolver from `(start, end, revision)` triples
    pub fn from_triples<'a, I>(triples: I) -> Result<Self, ConfigError>
        where I: IntoIterator<Item = (&'a str, Option<&'a str>, &'a str)>
    {
        let entries = triples
            .into_iter()
            .map(|(start, end, revision)| Ok((LotRange::new(start, end)?, revision.to_string())))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self::new(entries))
    }

    /// Returns the revision of the first range containing `lot`
    pub fn find(&self, lot: &str) -> Result<&str, LookupError>
    {
        if !is_valid_lot(lot) {
            return Err(LookupError::InvalidLot(lot.to_string()));
        }

        for (range, revision) in self.entries.iter() {
            if range.contains(lot)? {
                return Ok(revision.as_str());
            }
        }

        Err(LookupError::LotNotFound(lot.to_string()))
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}
