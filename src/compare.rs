//! Pass/fail comparison of one sample against one limit
//!
//! [`check`] is total: every limit/sample pair yields a [`Verdict`], and a sample of the wrong type is
//! just another failure reason. Nothing here panics or returns an error.

use std::fmt;
use serde::Serialize;
use crate::{
    limit::{ Criterion, Limit },
    sensor::Sample,
};

/// Why a sample failed its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason
{
    BelowLow,
    AboveHigh,
    PatternMismatch,
    WrongFlag,
    /// The sample cannot be compared with this kind of limit, including NaN readings
    BadType,
    /// No sample could be read. Only produced by a measurement, never by [`check`]
    SensorUnavailable,
}

impl Reason
{
    /// Machine-readable tag, e.g. `below_low`
    pub fn as_str(&self) -> &'static str
    {
        match self {
            Self::BelowLow => "below_low",
            Self::AboveHigh => "above_high",
            Self::PatternMismatch => "pattern_mismatch",
            Self::WrongFlag => "wrong_flag",
            Self::BadType => "bad_type",
            Self::SensorUnavailable => "sensor_unavailable",
        }
    }
}

impl fmt::Display for Reason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome
{
    Pass,
    Fail(Reason),
}

impl Outcome
{
    pub fn passed(&self) -> bool
    {
        match self {
            Self::Pass => true,
            _ => false,
        }
    }

    pub fn reason(&self) -> Option<Reason>
    {
        match *self {
            Self::Pass => None,
            Self::Fail(reason) => Some(reason),
        }
    }
}

/// The result of comparing one sample with one limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict
{
    /// Name of the limit that was applied
    pub name: String,
    /// The observed sample. `None` when the sensor produced nothing
    pub sample: Option<Sample>,
    pub outcome: Outcome,
}

impl Verdict
{
    pub fn passed(&self) -> bool
    {
        self.outcome.passed()
    }

    pub fn reason(&self) -> Option<Reason>
    {
        self.outcome.reason()
    }

    /// A failing verdict for a reading that never arrived
    pub(crate) fn unavailable(limit: &Limit) -> Self
    {
        Self {
            name: limit.name().to_string(),
            sample: None,
            outcome: Outcome::Fail(Reason::SensorUnavailable),
        }
    }
}

impl fmt::Display for Verdict
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.sample {
            Some(sample) => write!(f, "{} = {}: ", self.name, sample)?,
            None => write!(f, "{} = <none>: ", self.name)?,
        }

        match self.outcome {
            Outcome::Pass => f.write_str("PASS"),
            Outcome::Fail(reason) => write!(f, "FAIL ({})", reason),
        }
    }
}

/// Decides whether `sample` satisfies `limit`
pub fn check(limit: &Limit, sample: &Sample) -> Verdict
{
    let outcome = match limit.criterion() {
        Criterion::Numeric { low, high } => check_bounds(*low, *high, sample),
        Criterion::Counter { low, high } => match sample {
            // exact, f64 cannot hold every i64
            Sample::Integer(value) => within(*low, *high, *value),
            _ => check_bounds(low.map(|v| v as f64), high.map(|v| v as f64), sample),
        },
        Criterion::StringMatch { pattern } => match sample {
            Sample::Text(text) if pattern.is_match(text) => Outcome::Pass,
            Sample::Text(_) => Outcome::Fail(Reason::PatternMismatch),
            _ => Outcome::Fail(Reason::BadType),
        },
        Criterion::Boolean { flag } => match sample {
            Sample::Flag(value) if value == flag => Outcome::Pass,
            Sample::Flag(_) => Outcome::Fail(Reason::WrongFlag),
            _ => Outcome::Fail(Reason::BadType),
        },
    };

    Verdict {
        name: limit.name().to_string(),
        sample: Some(sample.clone()),
        outcome: outcome,
    }
}

/// Real value of a sample, accepting numeric literals carried as text
fn as_real(sample: &Sample) -> Option<f64>
{
    match sample {
        Sample::Number(value) => Some(*value),
        Sample::Integer(value) => Some(*value as f64),
        Sample::Text(text) => text.trim().parse::<f64>().ok(),
        Sample::Flag(_) => None,
    }
}

fn check_bounds(low: Option<f64>, high: Option<f64>, sample: &Sample) -> Outcome
{
    let value = match as_real(sample) {
        Some(value) if !value.is_nan() => value,
        _ => return Outcome::Fail(Reason::BadType),
    };

    within(low, high, value)
}

/// Inclusive bounds check, either bound optional
fn within<T>(low: Option<T>, high: Option<T>, value: T) -> Outcome
    where T: PartialOrd
{
    if low.map_or(false, |low| value < low) {
        Outcome::Fail(Reason::BelowLow)
    }
    else if high.map_or(false, |high| value > high) {
        Outcome::Fail(Reason::AboveHigh)
    }
    else {
        Outcome::Pass
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::limit::Bound;

    fn numeric(low: Option<f64>, high: Option<f64>) -> Limit
    {
        Limit::new("V", 1, low.map(Bound::Real), high.map(Bound::Real), None, None).unwrap()
    }

    fn reason_of(limit: &Limit, sample: impl Into<Sample>) -> Option<Reason>
    {
        check(limit, &sample.into()).reason()
    }

    #[test]
    fn five_volt_rail()
    {
        let limit = numeric(Some(4.998), Some(5.202));

        assert_eq!(reason_of(&limit, 4.998), None);
        assert_eq!(reason_of(&limit, 5.202), None);
        assert_eq!(reason_of(&limit, 4.997), Some(Reason::BelowLow));
        assert_eq!(reason_of(&limit, 5.2021), Some(Reason::AboveHigh));
    }

    #[test]
    fn lower_only()
    {
        let limit = Limit::new("PwrGoodOff", 1, Some(Bound::Real(0.5)), None, None, None).unwrap();

        assert_eq!(reason_of(&limit, 0.5), None);
        assert_eq!(reason_of(&limit, 10.0), None);
        assert_eq!(reason_of(&limit, 0.4), Some(Reason::BelowLow));
    }

    #[test]
    fn upper_only()
    {
        let limit = numeric(None, Some(0.1));

        assert_eq!(reason_of(&limit, -1000.0), None);
        assert_eq!(reason_of(&limit, 0.1), None);
        assert_eq!(reason_of(&limit, 0.11), Some(Reason::AboveHigh));
    }

    #[test]
    fn degenerate_band_accepts_its_point()
    {
        let limit = numeric(Some(3.3), Some(3.3));

        assert_eq!(reason_of(&limit, 3.3), None);
    }

    #[test]
    fn just_outside_fails()
    {
        let limit = numeric(Some(-2.5), Some(12.0));

        for eps in [1e-9, 1e-6, 1e-3, 1.0] {
            assert_eq!(reason_of(&limit, -2.5 - eps), Some(Reason::BelowLow));
            assert_eq!(reason_of(&limit, 12.0 + eps), Some(Reason::AboveHigh));
        }

        let next_above = f64::from_bits(12.0f64.to_bits() + 1);
        assert_eq!(reason_of(&limit, next_above), Some(Reason::AboveHigh));
    }

    #[test]
    fn nan_always_fails()
    {
        assert_eq!(reason_of(&numeric(Some(0.0), None), f64::NAN), Some(Reason::BadType));
        assert_eq!(reason_of(&numeric(None, Some(0.0)), "NaN"), Some(Reason::BadType));
    }

    #[test]
    fn numeric_coerces_literals_only()
    {
        let limit = numeric(Some(4.0), Some(6.0));

        assert_eq!(reason_of(&limit, 5i64), None);
        assert_eq!(reason_of(&limit, " 5.1 "), None);
        assert_eq!(reason_of(&limit, "five"), Some(Reason::BadType));
        assert_eq!(reason_of(&limit, true), Some(Reason::BadType));
    }

    #[test]
    fn serial_number_pattern_is_case_sensitive()
    {
        let limit = Limit::new("SerNum", 0, None, None, Some(r"^A[0-9]{4}[0-9A-Z]{2}[0-9]{4}$"), None).unwrap();

        assert_eq!(reason_of(&limit, "A1234AB5678"), None);
        assert_eq!(reason_of(&limit, "B1234AB5678"), Some(Reason::PatternMismatch));
        assert_eq!(reason_of(&limit, "A1234ab5678"), Some(Reason::PatternMismatch));
        assert_eq!(reason_of(&limit, 1234.0), Some(Reason::BadType));
    }

    #[test]
    fn unanchored_pattern_searches()
    {
        let limit = Limit::new("Fw", 0, None, None, Some("v2\\."), None).unwrap();

        assert_eq!(reason_of(&limit, "firmware v2.14"), None);
    }

    #[test]
    fn notify_flag()
    {
        let limit = Limit::new("Notify", 2, None, None, None, Some(true)).unwrap();

        assert_eq!(reason_of(&limit, true), None);
        assert_eq!(reason_of(&limit, false), Some(Reason::WrongFlag));
        assert_eq!(reason_of(&limit, 1i64), Some(Reason::BadType));
    }

    #[test]
    fn counter_uses_integer_bounds()
    {
        let limit = Limit::new("FixtureLock", 0, Some(Bound::Int(20)), None, None, None).unwrap();

        assert_eq!(reason_of(&limit, 20i64), None);
        assert_eq!(reason_of(&limit, 19i64), Some(Reason::BelowLow));
        assert_eq!(reason_of(&limit, "25"), None);
    }

    #[test]
    fn counter_exact_beyond_float_precision()
    {
        let step = 1i64 << 53;
        let limit = Limit::new("Cycles", 0, Some(Bound::Int(step + 1)), Some(Bound::Int(step + 3)), None, None).unwrap();

        assert_eq!(reason_of(&limit, step), Some(Reason::BelowLow));
        assert_eq!(reason_of(&limit, step + 1), None);
        assert_eq!(reason_of(&limit, step + 4), Some(Reason::AboveHigh));
    }

    #[test]
    fn verdict_carries_name_and_sample()
    {
        let verdict = check(&numeric(Some(1.0), None), &Sample::from(0.5));

        assert_eq!(verdict.name, "V");
        assert_eq!(verdict.sample, Some(Sample::Number(0.5)));
        assert_eq!(&format!("{}", verdict), "V = 0.5: FAIL (below_low)");
    }

    #[test]
    fn reason_tags()
    {
        assert_eq!(Reason::BelowLow.as_str(), "below_low");
        assert_eq!(Reason::SensorUnavailable.to_string(), "sensor_unavailable");
    }
}
