//! Loading limit tables from their six-field source form
//!
//! Product limits are shipped as JSON. A table is an array of records, each record an array of
//! exactly six fields:
//!
//! ```json
//! [
//!     ["SerNum", 0, null, null, "^A[0-9]{4}[0-9A-Z]{2}[0-9]{4}$", null],
//!     ["5V", 1, 4.998, 5.202, null, null],
//!     ["Notify", 2, null, null, null, true]
//! ]
//! ```
//!
//! A catalog is an object mapping variant names to tables, e.g. `{ "DATA": [...], "DATA_H": [...] }`.
//!
//! The loader is strict. A record with the wrong number of fields, a non-integer identity, or a field
//! of the wrong type is rejected with its position rather than guessed at. Product data has contained
//! all three kinds of mistake.

use std::{ fmt, path::Path };
use serde::{
    de::{ Deserializer, MapAccess, SeqAccess, Visitor },
    ser::{ SerializeMap, Serializer },
    Deserialize, Serialize,
};
use serde_json::Value;
use tracing::info;
use crate::{
    error::{ ConfigError, FieldErrorCause, FormatError },
    limit::{ Bound, Limit, RawLimit },
    table::{ Catalog, LimitTable },
};

/// Variant name given to a table loaded from a bare array
pub const DEFAULT_TABLE: &str = "DATA";

const FIELDS: usize = 6;

/// Parses a single table from JSON text
pub fn parse_table(text: &str) -> Result<LimitTable, ConfigError>
{
    let value: Value = serde_json::from_str(text)?;
    table_from_value(&value)
}

/// Parses a catalog from JSON text
///
/// A bare array is accepted as a catalog with one table named [`DEFAULT_TABLE`]. A variant named
/// twice is rejected.
pub fn parse_catalog(text: &str) -> Result<Catalog, ConfigError>
{
    let document: CatalogDocument = serde_json::from_str(text)?;
    document.catalog()
}

/// Reads and parses a catalog file
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, ConfigError>
{
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let catalog = parse_catalog(&text)?;
    info!(path = %path.display(), tables = catalog.len(), "limit catalog loaded");

    Ok(catalog)
}

/// A catalog as written, variants in document order
///
/// Decoded straight from JSON text so a variant name that appears twice is still seen twice. A
/// [`Value`] object keeps only the last of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogDocument(pub Vec<(String, Value)>);

impl CatalogDocument
{
    /// Decodes every variant table and builds the catalog
    pub fn catalog(&self) -> Result<Catalog, ConfigError>
    {
        let mut catalog = Catalog::new();

        for (name, table) in self.0.iter() {
            catalog.insert(name, table_from_value(table)?)?;
        }

        Ok(catalog)
    }
}

impl<'de> Deserialize<'de> for CatalogDocument
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: Deserializer<'de>
    {
        deserializer.deserialize_any(CatalogVisitor)
    }
}

impl Serialize for CatalogDocument
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, table) in self.0.iter() {
            map.serialize_entry(name, table)?;
        }
        map.end()
    }
}

struct CatalogVisitor;

impl<'de> Visitor<'de> for CatalogVisitor
{
    type Value = CatalogDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str("an object of limit tables or a single limit table")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where A: MapAccess<'de>
    {
        let mut variants = Vec::new();

        while let Some(entry) = map.next_entry::<String, Value>()? {
            variants.push(entry);
        }

        Ok(CatalogDocument(variants))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where A: SeqAccess<'de>
    {
        let mut records = Vec::new();

        while let Some(record) = seq.next_element::<Value>()? {
            records.push(record);
        }

        Ok(CatalogDocument(vec![(DEFAULT_TABLE.to_string(), Value::Array(records))]))
    }
}

pub fn table_from_value(value: &Value) -> Result<LimitTable, ConfigError>
{
    let records = match value {
        Value::Array(records) => records,
        other => return Err(FormatError {
            raw_data: other.to_string(),
            record: 0,
            field: 0,
            cause: FieldErrorCause::NotRecord,
        }.into()),
    };

    let mut limits = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let raw = raw_from_value(index + 1, record)?;
        limits.push(Limit::from_raw(raw)?);
    }

    LimitTable::build(limits)
}

/// Decodes one record, without validating kind exclusivity
pub fn raw_from_value(record: usize, value: &Value) -> Result<RawLimit, FormatError>
{
    let fail = |field, cause| FormatError {
        raw_data: value.to_string(),
        record: record,
        field: field,
        cause: cause,
    };

    let fields = match value {
        Value::Array(fields) => fields,
        _ => return Err(fail(0, FieldErrorCause::NotRecord)),
    };

    if fields.len() != FIELDS {
        return Err(fail(0, FieldErrorCause::Arity(fields.len())));
    }

    let name = match &fields[0] {
        Value::String(name) => name.clone(),
        _ => return Err(fail(1, FieldErrorCause::NotString)),
    };

    let identity = fields[1].as_i64().ok_or_else(|| fail(2, FieldErrorCause::NotInteger))?;
    let low = bound(&fields[2]).ok_or_else(|| fail(3, FieldErrorCause::NotNumber))?;
    let high = bound(&fields[3]).ok_or_else(|| fail(4, FieldErrorCause::NotNumber))?;

    let pattern = match &fields[4] {
        Value::Null => None,
        Value::String(pattern) => Some(pattern.clone()),
        _ => return Err(fail(5, FieldErrorCause::NotString)),
    };

    let flag = match &fields[5] {
        Value::Null => None,
        Value::Bool(flag) => Some(*flag),
        _ => return Err(fail(6, FieldErrorCause::NotBoolean)),
    };

    Ok(RawLimit {
        name: name,
        identity: identity,
        low: low,
        high: high,
        pattern: pattern,
        flag: flag,
    })
}

/// `Some(None)` for null, `None` when the field is not a number at all
fn bound(value: &Value) -> Option<Option<Bound>>
{
    match value {
        Value::Null => Some(None),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Some(Some(Bound::Int(int))),
            None => number.as_f64().map(|real| Some(Bound::Real(real))),
        },
        _ => None,
    }
}
