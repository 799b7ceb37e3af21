//! Measurements: a sensor bound to one or more limits, with a record of every reading
//!
//! A measurement belongs to one test sequence. Each call to [`Measurement::measure`] takes one sample,
//! judges it against every attached limit, and appends the result to the history. A sensor that
//! times out or faults produces a failing reading, not an error, so a run always continues to the
//! runner's next decision point.
//!
//! Outcomes are reported to the runner over an optional [`mpsc`] channel. Failures are always sent;
//! passes only when the owning table opted in with a set `Notify` record.

use std::{ sync::Arc, time::Duration };
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{ debug, warn };
use crate::{
    compare::{ self, Outcome, Reason, Verdict },
    error::{ LookupError, SensorError },
    limit::Limit,
    sensor::{ Sample, Sensor },
    table::LimitTable,
};

/// Notification sent to the runner after a measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event
{
    /// The measurement passed and its table asks for passes to be shown
    MeasurementPassed { name: String, sample: Sample },
    /// One limit failed. Sent once per failing limit
    MeasurementFailed { name: String, sample: Option<Sample>, reason: Reason },
}

/// One sample and the verdict of every attached limit on it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading
{
    pub sample: Option<Sample>,
    pub verdicts: Vec<Verdict>,
}

impl Reading
{
    /// True only for a real sample which every verdict passed
    pub fn passed(&self) -> bool
    {
        self.sample.is_some()
            && !self.verdicts.is_empty()
            && self.verdicts.iter().all(Verdict::passed)
    }

    /// The verdicts which failed
    pub fn failures(&self) -> impl Iterator<Item = &Verdict>
    {
        self.verdicts.iter().filter(|verdict| !verdict.passed())
    }
}

pub struct Measurement<S>
{
    name: String,
    limits: Vec<Arc<Limit>>,
    sensor: S,
    history: Vec<Reading>,
    notify: bool,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl<S> Measurement<S>
    where S: Sensor
{
    /// Binds the limit called `name` to a sensor
    pub fn bind(table: &LimitTable, name: &str, sensor: S) -> Result<Self, LookupError>
    {
        Self::bind_all(table, name, &[name], sensor)
    }

    /// Binds several limits which all judge the same sample
    ///
    /// An AC withstand measurement, for example, checks the same reading against both an arc-fault
    /// window and a voltage window.
    pub fn bind_all(table: &LimitTable, name: &str, limit_names: &[&str], sensor: S) -> Result<Self, LookupError>
    {
        let limits = limit_names
            .iter()
            .map(|limit_name| table.get(limit_name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(name, limits, sensor)?.notify(table.notify()))
    }

    /// Creates a measurement from limits that did not come from a table
    ///
    /// At least one limit is required. A measurement with nothing to judge could never fail.
    pub fn new(name: &str, limits: Vec<Arc<Limit>>, sensor: S) -> Result<Self, LookupError>
    {
        if limits.is_empty() {
            return Err(LookupError::NoLimits(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            limits: limits,
            sensor: sensor,
            history: Vec::new(),
            notify: false,
            events: None,
        })
    }

    /// Whether passes are reported as events
    pub fn notify(mut self, notify: bool) -> Self
    {
        self.notify = notify;
        self
    }

    /// Sends outcome events to the runner through `events`
    pub fn events(mut self, events: mpsc::UnboundedSender<Event>) -> Self
    {
        self.events = Some(events);
        self
    }

    /// Takes one sample, judges it, and records the reading
    ///
    /// Returns the reading just recorded. It passed only if every attached limit passed. The sensor
    /// is abandoned once `timeout` has passed, whether or not it honours the deadline itself.
    pub async fn measure(&mut self, timeout: Duration) -> &Reading
    {
        let result = match tokio::time::timeout(timeout, self.sensor.read(timeout)).await {
            Ok(result) => result,
            Err(_) => Err(SensorError::Timeout(timeout)),
        };

        let reading = match result {
            Ok(sample) => Reading {
                verdicts: self.limits.iter().map(|limit| compare::check(limit, &sample)).collect(),
                sample: Some(sample),
            },
            Err(err) => {
                warn!(measurement = %self.name, error = %err, "sensor unavailable");
                Reading {
                    verdicts: self.limits.iter().map(|limit| Verdict::unavailable(limit)).collect(),
                    sample: None,
                }
            },
        };

        for verdict in reading.verdicts.iter() {
            debug!(measurement = %self.name, "{}", verdict);
        }

        self.report(&reading);
        self.history.push(reading);

        &self.history[self.history.len() - 1]
    }

    fn report(&self, reading: &Reading)
    {
        let events = match &self.events {
            Some(events) => events,
            None => return,
        };

        // A runner that hung up its receiver has stopped listening; the reading is still recorded
        if reading.passed() {
            if let (true, Some(sample)) = (self.notify, &reading.sample) {
                let _ = events.send(Event::MeasurementPassed {
                    name: self.name.clone(),
                    sample: sample.clone(),
                });
            }
        }
        else {
            for verdict in reading.verdicts.iter() {
                if let Outcome::Fail(reason) = verdict.outcome {
                    let _ = events.send(Event::MeasurementFailed {
                        name: verdict.name.clone(),
                        sample: verdict.sample.clone(),
                        reason: reason,
                    });
                }
            }
        }
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn limits(&self) -> &[Arc<Limit>]
    {
        &self.limits
    }

    /// Every reading so far, oldest first
    pub fn history(&self) -> &[Reading]
    {
        &self.history
    }

    pub fn last(&self) -> Option<&Reading>
    {
        self.history.last()
    }

    /// Whether the latest reading passed. False before the first reading
    pub fn passed(&self) -> bool
    {
        self.last().map_or(false, Reading::passed)
    }

    pub fn clear_history(&mut self)
    {
        self.history.clear();
    }

    /// Releases the sensor, e.g. to hand the instrument to the next measurement
    pub fn into_sensor(self) -> S
    {
        self.sensor
    }
}
