//! Builders for the common limit shapes
//!
//! These produce exactly the same [`Limit`] values the tuple loader does, so product tables can be
//! written either way. The vocabulary is deliberately closed; add new shapes here, not at call sites.

use crate::{
    error::ConfigError,
    limit::{ self, Criterion, Identity, Limit },
};

/// Numeric limit accepting `low..=high`
pub fn hi_lo(name: &str, low: f64, high: f64) -> Result<Limit, ConfigError>
{
    measurement(name, Some(low), Some(high))
}

/// Numeric limit accepting `centre - delta..=centre + delta`
pub fn hi_lo_delta(name: &str, centre: f64, delta: f64) -> Result<Limit, ConfigError>
{
    if !(delta >= 0.0) {
        return Err(ConfigError::InvalidLimit {
            name: name.to_string(),
            reason: format!("delta must be non-negative, got {}", delta),
        });
    }

    measurement(name, Some(centre - delta), Some(centre + delta))
}

/// Numeric limit accepting anything up to and including `high`
pub fn hi(name: &str, high: f64) -> Result<Limit, ConfigError>
{
    measurement(name, None, Some(high))
}

/// Numeric limit accepting anything from `low` upward
pub fn lo(name: &str, low: f64) -> Result<Limit, ConfigError>
{
    measurement(name, Some(low), None)
}

/// Regular expression limit for text samples
pub fn string(name: &str, pattern: &str) -> Result<Limit, ConfigError>
{
    let pattern = limit::compile(name, pattern)?;
    build(name, Identity::SETUP, Criterion::StringMatch { pattern: pattern })
}

/// Boolean limit requiring `flag`
pub fn boolean(name: &str, flag: bool) -> Result<Limit, ConfigError>
{
    build(name, Identity::NOTIFICATION, Criterion::Boolean { flag: flag })
}

fn measurement(name: &str, low: Option<f64>, high: Option<f64>) -> Result<Limit, ConfigError>
{
    let criterion = limit::numeric(name, low, high)?;
    build(name, Identity::MEASUREMENT, criterion)
}

fn build(name: &str, identity: Identity, criterion: Criterion) -> Result<Limit, ConfigError>
{
    limit::validate_name(name)?;
    Ok(Limit::from_parts(name, identity, criterion))
}
