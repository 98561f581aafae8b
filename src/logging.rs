//! Structured logging for the diagnostic engine
//!
//! Narratives for the host UI travel over the event channel; this
//! module covers the operator-facing side: leveled console output,
//! JSON entries for aggregators, and per-run correlation IDs.

use crate::config::DiagConfig;
use crate::error::{AppError, Result};
use crate::types::ProbeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// One structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID tying the entry to one diagnostic run
    pub run_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Leveled logger with console and JSON formats
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    run_id: String,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger configured from the diagnostic config
    pub fn with_config(name: String, config: &DiagConfig) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug {
                LogFormat::Json
            } else {
                LogFormat::Console
            },
            name,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Correlation ID shared by every entry this logger writes
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder {
        self.log(LogLevel::Error, message)
    }

    /// Log a probe family outcome with its score
    pub fn log_family_score(&self, kind: ProbeKind, score: u8) {
        self.info(&format!("{} family scored {} / 100", kind, score))
            .field("probe_kind", kind.name())
            .field("score", score)
            .write();
    }

    /// Log an application error with its category attached
    pub fn log_app_error(&self, error: &AppError, context: &str) {
        self.error(&format!("{}: {}", context, error))
            .field("error_category", error.category())
            .field("fatal", error.is_fatal())
            .write();
    }

    fn write_entry(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };

        // Warnings and errors go to stderr, everything else to stdout.
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!(
                "{}{:>5}{}",
                entry.level.color_code(),
                level_str,
                LogLevel::reset_code()
            )
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!(
            "{} {} [{}] {}",
            timestamp, formatted_level, entry.logger, entry.message
        );

        if let Some(run_id) = &entry.run_id {
            output.push_str(&format!(" [{}]", &run_id[..8]));
        }

        if !entry.fields.is_empty() {
            let fields_str: Vec<String> = entry
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            )
        })
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                run_id: Some(logger.run_id.clone()),
                fields: HashMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Finalize and write the log entry
    pub fn write(self) {
        self.logger.write_entry(self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_logger_with_config_levels() {
        let mut config = DiagConfig::default();
        config.debug = true;
        config.enable_color = false;
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert!(!logger.use_color);
        assert_eq!(logger.format, LogFormat::Json);

        let quiet = Logger::with_config("TEST".to_string(), &DiagConfig::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
    }

    #[test]
    fn test_would_log() {
        let mut logger = Logger::new("TEST".to_string());
        logger.set_level(LogLevel::Warn);

        assert!(!logger.would_log(LogLevel::Debug));
        assert!(!logger.would_log(LogLevel::Info));
        assert!(logger.would_log(LogLevel::Warn));
        assert!(logger.would_log(LogLevel::Error));
    }

    #[test]
    fn test_run_id_is_stable_per_logger() {
        let logger = Logger::new("TEST".to_string());
        assert!(!logger.run_id().is_empty());
        assert_eq!(logger.run_id(), logger.run_id());
    }

    #[test]
    fn test_console_format() {
        let logger = Logger::new("TEST".to_string());
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "resolved target".to_string(),
            logger: "TEST".to_string(),
            run_id: Some("abcdef12-0000-0000-0000-000000000000".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert(
                    "domain".to_string(),
                    serde_json::Value::String("example.com".to_string()),
                );
                map
            },
        };

        let output = logger.format_console(&entry);
        assert!(output.contains("INFO"));
        assert!(output.contains("resolved target"));
        assert!(output.contains("abcdef12"));
        assert!(output.contains("domain"));
    }

    #[test]
    fn test_json_format_round_trips() {
        let logger = Logger::new("TEST".to_string());
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: "probe failed".to_string(),
            logger: "TEST".to_string(),
            run_id: None,
            fields: HashMap::new(),
        };

        let json = logger.format_json(&entry);
        let parsed: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.level, LogLevel::Error);
        assert_eq!(parsed.message, "probe failed");
    }
}
