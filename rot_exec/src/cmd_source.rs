//! # Command Source
//!
//! Reads pointing commands sent by the tracking program over a serial link. Each command is one
//! line of the form
//!
//! ```text
//! AZ123.4 EL45.0
//! ```
//!
//! The tracking program tends to send several lines in a burst. Only the last valid line of a
//! burst is acted upon, the others are already stale by the time the rotator could reach them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use std::io::{self, BufRead, BufReader, Read};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pointing target decoded from a command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Line oriented source of setpoints.
pub struct CmdSource<R: Read> {
    reader: BufReader<R>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Missing the {0} field")]
    MissingField(&'static str),

    #[error("Cannot parse {0} value {1:?}")]
    InvalidNumber(&'static str, String),

    #[error("Unexpected token {0:?}")]
    UnexpectedToken(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: Read> CmdSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Block until the next burst of commands arrives and return its last valid setpoint.
    ///
    /// Returns `None` once the input is closed.
    pub fn next_setpoint(&mut self) -> io::Result<Option<Setpoint>> {
        loop {
            let mut latest = None;
            let mut line = String::new();

            // Wait for the first line of a burst
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            accept(&line, &mut latest);

            // Then take every complete line already received
            while self.reader.buffer().contains(&b'\n') {
                line.clear();
                self.reader.read_line(&mut line)?;
                accept(&line, &mut latest);
            }

            if latest.is_some() {
                return Ok(latest);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse one command line.
pub fn parse_line(line: &str) -> Result<Setpoint, ParseError> {
    let mut az = None;
    let mut el = None;

    for token in line.split_whitespace() {
        if let Some(value) = token.strip_prefix("AZ") {
            az = Some(parse_value("AZ", value)?);
        }
        else if let Some(value) = token.strip_prefix("EL") {
            el = Some(parse_value("EL", value)?);
        }
        else {
            return Err(ParseError::UnexpectedToken(token.into()));
        }
    }

    Ok(Setpoint {
        azimuth_deg: az.ok_or(ParseError::MissingField("AZ"))?,
        elevation_deg: el.ok_or(ParseError::MissingField("EL"))?,
    })
}

fn parse_value(field: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber(field, value.into())),
    }
}

/// Parse a line of a burst, replacing the latest setpoint if it is valid.
fn accept(line: &str, latest: &mut Option<Setpoint>) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match parse_line(line) {
        Ok(s) => {
            trace!("Command {:?} -> {:?}", line, s);
            *latest = Some(s)
        }
        Err(e) => warn!("Skipping command {:?}: {}", line, e),
    }
}
