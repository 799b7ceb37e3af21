//! Error hierarchy
//!
//! Errors are split by when they can happen and who must deal with them:
//!   - [`ConfigError`] is raised while loading limits, tables, lot ranges, and station settings. It
//!     is fatal; a station must refuse to start with a broken configuration.
//!   - [`LookupError`] is raised when asking for something that does not exist, such as a limit
//!     name missing from a table or a lot number outside every known range.
//!   - [`SensorError`] describes a failed reading. It never escapes a measurement; it is converted
//!     into a failing verdict and recorded.
//!   - [`UsageError`] is raised synchronously when the API is driven through an invalid state
//!     transition.
//!
//! A failed comparison is not an error at all. See [`crate::compare::Verdict`].

use std::{ fmt, time::Duration };
use thiserror::Error;

/// A description of why a single field of a raw limit record was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorCause
{
    /// The record has the wrong number of fields
    Arity(usize),
    /// Expected a string
    NotString,
    /// Expected an integer
    NotInteger,
    /// Expected a number or `null`
    NotNumber,
    /// Expected a boolean or `null`
    NotBoolean,
    /// Expected a 6-element array
    NotRecord,
}

impl fmt::Display for FieldErrorCause
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Arity(found) => write!(f, "expected 6 fields, found {}", found),
            Self::NotString => f.write_str("expected a string"),
            Self::NotInteger => f.write_str("expected an integer"),
            Self::NotNumber => f.write_str("expected a number or null"),
            Self::NotBoolean => f.write_str("expected a boolean or null"),
            Self::NotRecord => f.write_str("expected an array of [name, identity, low, high, pattern, flag]"),
        }
    }
}

/// A limit record of unexpected or invalid shape in a limit source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError
{
    /// The offending record as it appeared in the source
    pub raw_data: String,
    /// Position of the record within its table. Indexed from 1
    pub record: usize,
    /// Which field the error occurred at. Indexed from 1, 0 when the record as a whole is bad
    pub field: usize,
    /// What went wrong
    pub cause: FieldErrorCause,
}

impl fmt::Display for FormatError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "At record {}, field {}: {}. Raw: {}", self.record, self.field, self.cause, self.raw_data)
    }
}

impl std::error::Error for FormatError {}

/// Load-time failure. The engine refuses to start when one of these occurs.
#[derive(Error, Debug)]
pub enum ConfigError
{
    #[error("malformed limit record. {0}")]
    Malformed(FormatError),

    #[error("duplicate limit name `{0}`")]
    DuplicateName(String),

    #[error("limit `{name}`: {reason}")]
    InvalidLimit { name: String, reason: String },

    #[error("limit `{name}`: pattern does not compile. {source}")]
    InvalidPattern
    {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown limit table `{0}`")]
    UnknownTable(String),

    #[error("invalid lot number `{0}`. Expected [AS]NNNNXX")]
    InvalidLot(String),

    #[error("invalid lot range: end `{end}` precedes start `{start}`")]
    InvalidLotRange { start: String, end: String },

    #[error("invalid station setting: {0}")]
    InvalidSetting(String),

    #[error("unable to parse source. {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to read source. {0}")]
    Io(#[from] std::io::Error),
}

impl From<FormatError> for ConfigError
{
    fn from(this: FormatError) -> Self
    {
        ConfigError::Malformed(this)
    }
}

/// A request for something that does not exist
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError
{
    #[error("no limit named `{0}`")]
    UnknownLimit(String),

    #[error("lot `{0}` is not in any known range")]
    LotNotFound(String),

    #[error("invalid lot number `{0}`. Expected [AS]NNNNXX")]
    InvalidLot(String),

    #[error("measurement `{0}` has no limits to judge it")]
    NoLimits(String),
}

/// A failure to obtain a sample from a sensor
#[derive(Error, Debug)]
pub enum SensorError
{
    #[error("no reading within {0:?}")]
    Timeout(Duration),

    #[error("instrument rejected the query")]
    Rejected,

    #[error("unable to decode reply. {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("unexpected reply `{raw}`: {mesg}")]
    Format { raw: String, mesg: &'static str },

    #[error("instrument I/O failed. {0}")]
    Io(#[from] std::io::Error),
}

/// An invalid state transition requested by the caller
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError
{
    #[error("timer is already armed")]
    AlreadyArmed,

    #[error("timer was never armed")]
    NotArmed,
}
