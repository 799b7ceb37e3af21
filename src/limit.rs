//! Limit records: the acceptance criterion for one named quantity
//!
//! Product limit sources describe every criterion with the same six slots
//! `(name, identity, low, high, pattern, flag)`, only some of which are populated. [`Limit::from_raw`]
//! validates which slots are populated and turns the record into a [`Criterion`], so the rest of the
//! engine never has to guess which kind of limit it is dealing with.

use std::fmt;
use regex::Regex;
use serde::Serialize;
use crate::error::ConfigError;

/// Opaque grouping tag carried by every limit
///
/// The engine never dispatches on it. The runner uses it to decide how a limit is displayed and
/// logged. Values other than the three conventional ones are passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Identity(pub i64);

impl Identity
{
    /// Setup steps, serial numbers, fixture counters
    pub const SETUP: Identity = Identity(0);
    /// Scalar measurements
    pub const MEASUREMENT: Identity = Identity(1);
    /// Notification flags
    pub const NOTIFICATION: Identity = Identity(2);
}

impl fmt::Display for Identity
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// A bound as written in the limit source
///
/// Integers and reals are kept apart because only all-integer bounds can form a counter limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound
{
    Int(i64),
    Real(f64),
}

impl Bound
{
    pub fn as_f64(&self) -> f64
    {
        match *self {
            Self::Int(value) => value as f64,
            Self::Real(value) => value,
        }
    }

    fn as_int(&self) -> Option<i64>
    {
        match *self {
            Self::Int(value) => Some(value),
            Self::Real(_) => None,
        }
    }
}

impl From<i64> for Bound
{
    fn from(value: i64) -> Self
    {
        Bound::Int(value)
    }
}

impl From<f64> for Bound
{
    fn from(value: f64) -> Self
    {
        Bound::Real(value)
    }
}

/// The raw six-slot shape of a limit record, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawLimit
{
    pub name: String,
    pub identity: i64,
    pub low: Option<Bound>,
    pub high: Option<Bound>,
    pub pattern: Option<String>,
    pub flag: Option<bool>,
}

/// Which comparison a limit performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind
{
    Numeric,
    StringMatch,
    Boolean,
    Counter,
}

/// The validated acceptance criterion
#[derive(Debug, Clone)]
pub enum Criterion
{
    /// Inclusive real bounds. At least one is set
    Numeric { low: Option<f64>, high: Option<f64> },
    /// Regular expression searched for in a text sample. Anchoring is up to the author
    StringMatch { pattern: Regex },
    /// Required value of a boolean sample
    Boolean { flag: bool },
    /// Inclusive integer bounds, used for fixture-lock step counts. At least one is set
    Counter { low: Option<i64>, high: Option<i64> },
}

impl Criterion
{
    pub fn kind(&self) -> Kind
    {
        match self {
            Self::Numeric { .. } => Kind::Numeric,
            Self::StringMatch { .. } => Kind::StringMatch,
            Self::Boolean { .. } => Kind::Boolean,
            Self::Counter { .. } => Kind::Counter,
        }
    }
}

impl PartialEq for Criterion
{
    fn eq(&self, rhs: &Self) -> bool
    {
        match (self, rhs) {
            (Self::Numeric { low: l1, high: h1 }, Self::Numeric { low: l2, high: h2 }) => l1 == l2 && h1 == h2,
            (Self::StringMatch { pattern: p1 }, Self::StringMatch { pattern: p2 }) => p1.as_str() == p2.as_str(),
            (Self::Boolean { flag: f1 }, Self::Boolean { flag: f2 }) => f1 == f2,
            (Self::Counter { low: l1, high: h1 }, Self::Counter { low: l2, high: h2 }) => l1 == l2 && h1 == h2,
            _ => false,
        }
    }
}

/// An immutable, validated limit record
#[derive(Debug, Clone, PartialEq)]
pub struct Limit
{
    name: String,
    identity: Identity,
    criterion: Criterion,
}

impl Limit
{
    /// Validates a record given in the six-slot source shape
    pub fn new(
        name: &str,
        identity: i64,
        low: Option<Bound>,
        high: Option<Bound>,
        pattern: Option<&str>,
        flag: Option<bool>,
    )
        -> Result<Self, ConfigError>
    {
        Self::from_raw(RawLimit {
            name: name.to_string(),
            identity: identity,
            low: low,
            high: high,
            pattern: pattern.map(str::to_string),
            flag: flag,
        })
    }

    /// Validates a raw record and classifies its kind
    ///
    /// Exactly one kind may be active:
    ///   - a pattern excludes bounds and flag
    ///   - a flag excludes bounds and pattern
    ///   - setup-identity records whose present bounds are all integers are counters
    ///   - anything else is numeric and needs at least one bound
    pub fn from_raw(raw: RawLimit) -> Result<Self, ConfigError>
    {
        let RawLimit { name, identity, low, high, pattern, flag } = raw;

        validate_name(&name)?;

        let has_bounds = low.is_some() || high.is_some();

        let criterion = match (pattern, flag) {
            (Some(_), Some(_)) => return Err(invalid(&name, "pattern and flag are mutually exclusive")),
            (Some(pattern), None) => {
                if has_bounds {
                    return Err(invalid(&name, "a pattern limit cannot have bounds"));
                }
                Criterion::StringMatch { pattern: compile(&name, &pattern)? }
            },
            (None, Some(flag)) => {
                if has_bounds {
                    return Err(invalid(&name, "a flag limit cannot have bounds"));
                }
                Criterion::Boolean { flag: flag }
            },
            (None, None) => {
                if !has_bounds {
                    return Err(invalid(&name, "a numeric limit needs at least one bound"));
                }
                classify_bounds(&name, Identity(identity), low, high)?
            },
        };

        Ok(Self {
            name: name,
            identity: Identity(identity),
            criterion: criterion,
        })
    }

    /// Assembles an already-validated criterion. Used by the factory builders
    pub(crate) fn from_parts(name: &str, identity: Identity, criterion: Criterion) -> Self
    {
        Self {
            name: name.to_string(),
            identity: identity,
            criterion: criterion,
        }
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn identity(&self) -> Identity
    {
        self.identity
    }

    pub fn criterion(&self) -> &Criterion
    {
        &self.criterion
    }

    pub fn kind(&self) -> Kind
    {
        self.criterion.kind()
    }
}

impl fmt::Display for Limit
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.criterion {
            Criterion::Numeric { low, high } => write!(f, "{} [{}, {}]", self.name, fmt_bound(low), fmt_bound(high)),
            Criterion::Counter { low, high } => write!(f, "{} #[{}, {}]", self.name, fmt_bound(low), fmt_bound(high)),
            Criterion::StringMatch { pattern } => write!(f, "{} ~ /{}/", self.name, pattern.as_str()),
            Criterion::Boolean { flag } => write!(f, "{} == {}", self.name, flag),
        }
    }
}

fn fmt_bound<T: fmt::Display>(bound: &Option<T>) -> String
{
    match bound {
        Some(value) => value.to_string(),
        None => "-".to_string(),
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ConfigError>
{
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(invalid(name, "name must be a non-empty printable string"));
    }

    Ok(())
}

fn invalid(name: &str, reason: &str) -> ConfigError
{
    ConfigError::InvalidLimit {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn compile(name: &str, pattern: &str) -> Result<Regex, ConfigError>
{
    Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
        name: name.to_string(),
        source: err,
    })
}

fn classify_bounds(
    name: &str,
    identity: Identity,
    low: Option<Bound>,
    high: Option<Bound>,
)
    -> Result<Criterion, ConfigError>
{
    let all_int = low.map_or(true, |bound| bound.as_int().is_some())
        && high.map_or(true, |bound| bound.as_int().is_some());

    if identity == Identity::SETUP && all_int {
        let low = low.and_then(|bound| bound.as_int());
        let high = high.and_then(|bound| bound.as_int());

        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                return Err(invalid(name, "low bound exceeds high bound"));
            }
        }

        return Ok(Criterion::Counter { low: low, high: high });
    }

    numeric(name, low.map(|bound| bound.as_f64()), high.map(|bound| bound.as_f64()))
}

/// Validates real bounds for a numeric criterion
pub(crate) fn numeric(name: &str, low: Option<f64>, high: Option<f64>) -> Result<Criterion, ConfigError>
{
    if low.is_none() && high.is_none() {
        return Err(invalid(name, "a numeric limit needs at least one bound"));
    }

    if low.map_or(false, |value| !value.is_finite()) || high.map_or(false, |value| !value.is_finite()) {
        return Err(invalid(name, "bounds must be finite"));
    }

    if let (Some(low), Some(high)) = (low, high) {
        if low > high {
            return Err(invalid(name, "low bound exceeds high bound"));
        }
    }

    Ok(Criterion::Numeric { low: low, high: high })
}
