//! Sensor contract and a generic line-protocol sensor
//!
//! The engine does not talk to instruments itself. Anything that can produce a [`Sample`] within a
//! deadline can be bound to a measurement by implementing [`Sensor`]. Most bench instruments (DMMs,
//! safety testers, programmable sources) speak a query/reply ASCII protocol, so [`LineSensor`] covers
//! them over any already-opened async stream: a serial port, a TCP socket to a LAN instrument, or
//! an in-memory pipe in tests.
//!
//! # Cancel Safety
//! A [`LineSensor`] read writes a query and then waits for the reply. When the deadline passes
//! between the two, the reply may still arrive later. Before every query the sensor discards what it
//! has buffered and whatever the instrument has already sent, so a late reply that has arrived by then
//! is not taken as the answer to the new query. A reply still in flight when the next query is written
//! cannot be told apart from a fresh one; instruments that can be that slow should be given a longer
//! timeout.

use std::{ fmt, time::Duration };
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{ AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt };
use tracing::{ debug, warn };
use crate::error::SensorError;

/// One reading produced by a sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample
{
    Number(f64),
    Integer(i64),
    Text(String),
    Flag(bool),
}

impl fmt::Display for Sample
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{:?}", value),
            Self::Flag(value) => write!(f, "{}", value),
        }
    }
}

impl From<f64> for Sample
{
    fn from(value: f64) -> Self
    {
        Sample::Number(value)
    }
}

impl From<i64> for Sample
{
    fn from(value: i64) -> Self
    {
        Sample::Integer(value)
    }
}

impl From<bool> for Sample
{
    fn from(value: bool) -> Self
    {
        Sample::Flag(value)
    }
}

impl From<&str> for Sample
{
    fn from(value: &str) -> Self
    {
        Sample::Text(value.to_string())
    }
}

impl From<String> for Sample
{
    fn from(value: String) -> Self
    {
        Sample::Text(value)
    }
}

/// A source of samples
///
/// Implementations must return within roughly `timeout`, either with a sample or with
/// [`SensorError::Timeout`]. Any error is recorded by the measurement as an unavailable sensor.
#[async_trait]
pub trait Sensor: Send
{
    async fn read(&mut self, timeout: Duration) -> Result<Sample, SensorError>;
}

#[async_trait]
impl<S> Sensor for Box<S>
    where S: Sensor + ?Sized
{
    async fn read(&mut self, timeout: Duration) -> Result<Sample, SensorError>
    {
        (**self).read(timeout).await
    }
}

/// How a reply line is turned into a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind
{
    /// A decimal or scientific-notation real, e.g. `+5.00120E+00`
    Number,
    /// A whole number, e.g. a fixture lock step count
    Integer,
    /// The reply text verbatim, minus the line ending
    Text,
    /// `1`/`0`, `ON`/`OFF`, or `TRUE`/`FALSE` (case insensitive)
    Flag,
}

impl ReplyKind
{
    fn parse(&self, reply: &str) -> Result<Sample, SensorError>
    {
        let token = reply.trim();
        let format_err = |mesg| SensorError::Format { raw: reply.to_string(), mesg: mesg };

        match self {
            Self::Number => token.parse::<f64>()
                .map(Sample::Number)
                .map_err(|_| format_err("expected a real number")),
            Self::Integer => token.parse::<i64>()
                .map(Sample::Integer)
                .map_err(|_| format_err("expected an integer")),
            Self::Text => Ok(Sample::Text(token.to_string())),
            Self::Flag => match token.to_ascii_uppercase().as_str() {
                "1" | "ON" | "TRUE" => Ok(Sample::Flag(true)),
                "0" | "OFF" | "FALSE" => Ok(Sample::Flag(false)),
                _ => Err(format_err("expected one of ['1', '0', 'ON', 'OFF', 'TRUE', 'FALSE']")),
            },
        }
    }
}

const NAK: u8 = 0x15;
const LF: u8 = 0x0A;

/// A sensor which sends a query line to an instrument and reads back a one-line reply
pub struct LineSensor<T>
{
    query: String,
    line_ending: &'static str,
    reply: ReplyKind,
    io_handle: T,
    read_buf: Vec<u8>,
}

impl<T> LineSensor<T>
    where T: AsyncRead + AsyncWrite + Unpin + Send
{
    /// Creates a sensor which sends `query` terminated by `\n`
    pub fn with(io_handle: T, query: &str, reply: ReplyKind) -> Self
    {
        Self {
            query: query.to_string(),
            line_ending: "\n",
            reply: reply,
            io_handle: io_handle,
            read_buf: Vec::with_capacity(128),
        }
    }

    /// Changes the terminator appended to each query, e.g. `"\r\n"`
    pub fn line_ending(mut self, line_ending: &'static str) -> Self
    {
        self.line_ending = line_ending;
        self
    }

    /// Releases the underlying stream
    pub fn into_inner(self) -> T
    {
        self.io_handle
    }

    /// Drops the first `n` bytes from the read buffer
    ///
    /// Drops all bytes if `n >= self.read_buf.len()`
    fn drop_first(&mut self, n: usize)
    {
        if n >= self.read_buf.len() {
            self.read_buf.clear();
        }
        else {
            self.read_buf.drain(..n);
            self.read_buf.shrink_to(128);
        }
    }

    /// Returns the index of the first linefeed in the read buffer at or after `start_hint`
    fn find_line_ending(&self, start_hint: usize) -> Option<usize>
    {
        self.read_buf
            .get(start_hint..)?
            .iter()
            .position(|byte| *byte == LF)
            .map(|offset| start_hint + offset)
    }

    /// Reads until the buffer holds a full line and returns the length of that line including
    /// its linefeed
    ///
    /// Only ever appends to the buffer, so a cancelled call loses nothing.
    async fn read_line(&mut self) -> Result<usize, std::io::Error>
    {
        let mut end_index = self.find_line_ending(0);

        while end_index.is_none() {
            let mut temp_buf = [0u8; 64];
            let prior_end = self.read_buf.len();
            let bytes_read = self.io_handle.read(&mut temp_buf[..]).await?;

            if bytes_read == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
            }

            self.read_buf.extend_from_slice(&temp_buf[..bytes_read]);
            end_index = self.find_line_ending(prior_end);
        }

        Ok(end_index.map_or(0, |index| index + 1))
    }

    /// Takes `size` bytes off the front of the buffer as a string
    fn get_string(&mut self, size: usize) -> Result<String, std::string::FromUtf8Error>
    {
        let mut response = Vec::with_capacity(size);
        // Instruments reply in extended ASCII (code page 437) for the ohm and micro signs
        for byte in &self.read_buf[..size] {
            match *byte {
                0xEA => push_char(&mut response, 'Ω'),
                0xE6 => push_char(&mut response, 'µ'),
                other => response.push(other),
            }
        }
        self.drop_first(size);

        String::from_utf8(response)
    }

    /// Drops buffered bytes and any bytes the instrument has already sent, without waiting for more
    async fn discard_stale(&mut self) -> Result<(), std::io::Error>
    {
        let mut discarded = self.read_buf.len();
        self.read_buf.clear();

        loop {
            let mut temp_buf = [0u8; 64];
            // a zero timeout still polls the read once, so only bytes already available are taken
            match tokio::time::timeout(Duration::ZERO, self.io_handle.read(&mut temp_buf[..])).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(bytes_read)) => discarded += bytes_read,
                Ok(Err(err)) => return Err(err),
            }
        }

        if discarded > 0 {
            warn!(query = %self.query, discarded, "discarded stale instrument output");
        }

        Ok(())
    }

    /// Sends the query and parses one reply line
    async fn exchange(&mut self) -> Result<Sample, SensorError>
    {
        self.discard_stale().await?;

        let serialized = format!("{}{}", self.query, self.line_ending);
        self.io_handle.write_all(serialized.as_bytes()).await?;
        self.io_handle.flush().await?;

        let response_len = self.read_line().await?;

        if response_len < 2 || self.read_buf[0] == NAK {
            self.drop_first(response_len);
            return Err(SensorError::Rejected);
        }

        let response = self.get_string(response_len)?;
        debug!(query = %self.query, reply = %response.trim_end(), "instrument reply");

        self.reply.parse(&response)
    }
}

fn push_char(buf: &mut Vec<u8>, ch: char)
{
    let mut encoded = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
}

#[async_trait]
impl<T> Sensor for LineSensor<T>
    where T: AsyncRead + AsyncWrite + Unpin + Send
{
    async fn read(&mut self, timeout: Duration) -> Result<Sample, SensorError>
    {
        match tokio::time::timeout(timeout, self.exchange()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(query = %self.query, ?timeout, "instrument did not reply in time");
                self.read_buf.clear();
                Err(SensorError::Timeout(timeout))
            },
        }
    }
}
