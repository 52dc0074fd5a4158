//! Structured JSON logger
//!
//! One log line = one event, written synchronously with deterministic key
//! ordering (`event`, then `severity`, then fields in the order given).
//! Only lifecycle edges log; operations return errors instead of logging on
//! the caller's behalf.

use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace,
    /// Normal operations
    Info,
    /// Recoverable issues
    Warn,
    /// Operation failures
    Error,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous structured logger
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::render(severity, event, fields);
        let mut out = io::stderr();
        let _ = writeln!(out, "{}", line);
    }

    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut line = String::with_capacity(128);
        line.push('{');
        line.push_str(&format!(
            "\"event\":{},\"severity\":\"{}\"",
            json_string(event),
            severity
        ));
        for (key, value) in fields {
            line.push(',');
            line.push_str(&json_string(key));
            line.push(':');
            line.push_str(&json_string(value));
        }
        line.push('}');
        line
    }
}

/// Escape a string as a JSON literal
fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_deterministic_order() {
        let line = Logger::render(
            Severity::Info,
            "database_initialized",
            &[("database", "app"), ("tables", "2")],
        );
        assert_eq!(
            line,
            "{\"event\":\"database_initialized\",\"severity\":\"INFO\",\"database\":\"app\",\"tables\":\"2\"}"
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let line = Logger::render(Severity::Error, "x", &[("error", "a \"quoted\" cause")]);
        assert!(line.contains("a \\\"quoted\\\" cause"));
    }
}
