//! Line classification for submitted log text
//!
//! Each non-blank line is matched against one fixed shape:
//!
//! ```text
//! [timestamp] [level] message
//! ```
//!
//! Lines of that shape become [`LogEntry::Structured`], everything else is kept
//! verbatim as [`LogEntry::Raw`]. Lines are classified independently; there is
//! no multi-line entry support and no format detection.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// `[A] [B] C`, anchored to the whole line.
///
/// `A` and `B` are lazy so they close at the first `]` that is followed by the
/// required whitespace, `C` takes the rest of the line. Whitespace is the ASCII
/// set `\t \n \f \r` plus space (no `\v`, no Unicode spaces).
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(.*?)\][\t\n\f\r ]+\[(.*?)\][\t\n\f\r ]+(.*)$").unwrap()
});

/// One classified input line
///
/// Serializes to either `{"timestamp", "level", "message"}` or `{"raw"}`.
/// Empty fields are left out, so `[] [L] m` encodes as `{"level":"L","message":"m"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LogEntry {
    Structured {
        #[serde(skip_serializing_if = "String::is_empty")]
        timestamp: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        level: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        message: String,
    },
    Raw {
        raw: String,
    },
}

impl LogEntry {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    /// Label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Structured { .. } => "structured",
            Self::Raw { .. } => "raw",
        }
    }
}

/// Classify a single trimmed, non-empty line
///
/// The match is all-or-nothing: a line that does not fit the pattern exactly is
/// returned unmodified as a raw entry.
pub fn classify_line(line: &str) -> LogEntry {
    match LINE_RE.captures(line) {
        Some(caps) => LogEntry::Structured {
            timestamp: caps[1].to_string(),
            level: caps[2].to_string(),
            message: caps[3].to_string(),
        },
        None => LogEntry::Raw {
            raw: line.to_string(),
        },
    }
}

/// Classify a block of text line by line
///
/// Splits on `\n`, trims each segment (a trailing `\r` goes with the trim) and
/// drops segments that end up empty. Output order follows input order.
pub fn classify_text(text: &str) -> Vec<LogEntry> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(classify_line)
        .collect()
}
