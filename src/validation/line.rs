//! Parsing of a single `DATA.TXT` line: `yyyy/MM/dd;HH:mm;xxxxxxxx-x`.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::attendance::NewAttendance;
use crate::model::employee::DATE_FORMAT;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}/\d{2}/\d{2}$").expect("date pattern"));
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("time pattern"));
pub static RUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,8}-[0-9Kk]$").expect("rut pattern"));

const TIME_FORMAT: &str = "%H:%M";

/// Why a line was rejected. Every variant cites the 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("Line {line} is malformed: expected exactly 3 fields separated by \";\", found {fields}")]
    Malformed { line: usize, fields: usize },

    #[error("Line {line}: invalid date {value:?}, expected yyyy/MM/dd")]
    InvalidDate { line: usize, value: String },

    #[error("Line {line}: invalid time {value:?}, expected HH:mm")]
    InvalidTime { line: usize, value: String },

    #[error("Line {line}: invalid RUT {value:?}, expected xxxxxxxx-x")]
    InvalidId { line: usize, value: String },
}

impl LineError {
    pub fn line(&self) -> usize {
        match self {
            LineError::Malformed { line, .. }
            | LineError::InvalidDate { line, .. }
            | LineError::InvalidTime { line, .. }
            | LineError::InvalidId { line, .. } => *line,
        }
    }
}

/// The three fields of a valid line, trimmed and otherwise verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub date: String,
    pub time: String,
    pub person_id: String,
}

impl From<ParsedLine> for NewAttendance {
    fn from(parsed: ParsedLine) -> Self {
        NewAttendance {
            date: parsed.date,
            time: parsed.time,
            person_id: parsed.person_id,
        }
    }
}

pub fn validate_line(raw: &str, line_number: usize) -> Result<ParsedLine, LineError> {
    let fields: Vec<&str> = raw.trim().split(';').map(str::trim).collect();
    let [date, time, person_id] = fields[..] else {
        return Err(LineError::Malformed {
            line: line_number,
            fields: fields.len(),
        });
    };

    if !is_date(date) {
        return Err(LineError::InvalidDate {
            line: line_number,
            value: date.to_string(),
        });
    }

    if !is_time(time) {
        return Err(LineError::InvalidTime {
            line: line_number,
            value: time.to_string(),
        });
    }

    if !is_rut(person_id) {
        return Err(LineError::InvalidId {
            line: line_number,
            value: person_id.to_string(),
        });
    }

    Ok(ParsedLine {
        date: date.to_string(),
        time: time.to_string(),
        person_id: person_id.to_string(),
    })
}

/// `yyyy/MM/dd` that names a real calendar day.
pub fn is_date(value: &str) -> bool {
    DATE_RE.is_match(value) && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// `HH:mm` between `00:00` and `23:59`.
pub fn is_time(value: &str) -> bool {
    TIME_RE.is_match(value) && NaiveTime::parse_from_str(value, TIME_FORMAT).is_ok()
}

pub fn is_rut(value: &str) -> bool {
    RUT_RE.is_match(value)
}
