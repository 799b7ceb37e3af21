//! **A**synchronous-**R**ust acceptance **C**riteria for production test **S**tations
//!
//! Production test programs measure a unit with bench instruments and judge each reading against a
//! product-specific limit. This crate is the part those programs share:
//!   - [`limit`], [`factory`], [`source`]: limit records, built in code or loaded from six-field JSON
//!     tuples
//!   - [`table`]: uniquely named limit tables, and catalogs of per-variant tables
//!   - [`compare`]: the pass/fail decision for numeric, pattern, flag, and counter limits
//!   - [`measure`], [`sensor`]: sensors bound to limits, with a history of every reading
//!   - [`lots`]: lot number to product revision resolution
//!   - [`timer`]: a cancellable one-shot background timer
//!   - [`config`]: station set-up from one JSON document
//!
//! Instrument drivers and transports are not part of the crate. A driver only has to implement
//! [`sensor::Sensor`], or speak a line protocol over a stream handed to [`sensor::LineSensor`].
//!
//! ```no_run
//! use arcs_limits::{ config::StationConfig, measure::Measurement, sensor::{ LineSensor, ReplyKind } };
//!
//! # async fn run<T>(dmm: T) -> Result<(), Box<dyn std::error::Error>>
//! #     where T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send
//! # {
//! let station = StationConfig::load("station.json")?.open()?;
//! let sensor = LineSensor::with(dmm, "MEAS:VOLT:DC?", ReplyKind::Number);
//! let mut rail = Measurement::bind(&station.table, "5V", sensor)?;
//!
//! if !rail.measure(station.timeout).await.passed() {
//!     println!("5V rail out of limits");
//! }
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod factory;
pub mod limit;
pub mod lots;
pub mod measure;
pub mod sensor;
pub mod source;
pub mod table;
pub mod timer;

pub use compare::{ check, Outcome, Reason, Verdict };
pub use error::{ ConfigError, LookupError, SensorError, UsageError };
pub use limit::{ Criterion, Identity, Kind, Limit };
pub use lots::{ LotRange, Revision };
pub use measure::{ Event, Measurement, Reading };
pub use sensor::{ Sample, Sensor };
pub use table::{ Catalog, LimitTable };
pub use timer::Timer;
