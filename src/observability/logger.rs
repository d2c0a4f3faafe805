//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, unbuffered
//! - WARN and above go to stderr
//! - Events below the process-wide minimum severity (default INFO) are
//!   dropped before rendering

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Severity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Structured logger
pub struct Logger;

impl Logger {
    /// Sets the process-wide minimum severity
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Returns true if events at `severity` are written
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Logs an event
    pub fn log(severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = Self::render(severity, event, fields);
        if severity >= Severity::Warn {
            Self::write_line(&mut io::stderr(), &line);
        } else {
            Self::write_line(&mut io::stdout(), &line);
        }
    }

    pub fn trace(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // single write per line
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Renders one log line, newline included
    pub(crate) fn render(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut out = String::with_capacity(128);
        out.push_str("{\"event\":");
        out.push_str(&quote(event.as_str()));
        out.push_str(",\"severity\":");
        out.push_str(&quote(severity.as_str()));
        for (key, value) in sorted {
            out.push(',');
            out.push_str(&quote(key));
            out.push(':');
            out.push_str(&quote(value));
        }
        out.push_str("}\n");
        out
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_json() {
        let line = Logger::render(
            Severity::Info,
            Event::OpWrite,
            &[("collection", "docs"), ("v", "3")],
        );
        let parsed: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed["event"], "OP_WRITE");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["collection"], "docs");
        assert_eq!(parsed["v"], "3");
    }

    #[test]
    fn test_render_field_order_deterministic() {
        let a = Logger::render(Severity::Warn, Event::EngineError, &[("z", "1"), ("a", "2")]);
        let b = Logger::render(Severity::Warn, Event::EngineError, &[("a", "2"), ("z", "1")]);
        assert_eq!(a, b);
        assert!(a.find("\"event\"").unwrap() < a.find("\"severity\"").unwrap());
        assert!(a.find("\"a\"").unwrap() < a.find("\"z\"").unwrap());
    }

    #[test]
    fn test_render_escapes() {
        let line = Logger::render(
            Severity::Error,
            Event::EngineError,
            &[("message", "bad \"quote\"\nnext")],
        );
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "bad \"quote\"\nnext");
    }

    #[test]
    fn test_trace_suppressed_by_default() {
        // no code in this binary lowers the threshold below INFO
        assert!(!Logger::enabled(Severity::Trace));
        assert!(Logger::enabled(Severity::Info));
        assert!(Logger::enabled(Severity::Error));
    }

    #[test]
    fn test_severity_parses_lowercase() {
        let level: Severity = serde_json::from_str("\"trace\"").unwrap();
        assert_eq!(level, Severity::Trace);
        assert_eq!(Severity::default(), Severity::Info);
        assert_eq!(Severity::from_u8(Severity::Warn as u8), Severity::Warn);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }
}
