//! Error handling for the network health diagnostic engine

use thiserror::Error;

/// Custom error types for the diagnostic engine
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS resolution errors (fatal to a diagnostic run)
    #[error("DNS resolution error: {0}")]
    Resolution(String),

    /// A probe exceeded its wall-clock timeout budget
    #[error("Probe timeout: {0}")]
    ProbeTimeout(String),

    /// A probe failed with an I/O error (connection refused, reset, ...)
    #[error("Probe I/O error: {0}")]
    ProbeIo(String),

    /// The external ping-equivalent process could not be spawned
    #[error("Process spawn error: {0}")]
    Spawn(String),

    /// Malformed tool output or unparseable values
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new DNS resolution error
    pub fn resolution<S: Into<String>>(message: S) -> Self {
        Self::Resolution(message.into())
    }

    /// Create a new probe timeout error
    pub fn probe_timeout<S: Into<String>>(message: S) -> Self {
        Self::ProbeTimeout(message.into())
    }

    /// Create a new probe I/O error
    pub fn probe_io<S: Into<String>>(message: S) -> Self {
        Self::ProbeIo(message.into())
    }

    /// Create a new process spawn error
    pub fn spawn<S: Into<String>>(message: S) -> Self {
        Self::Spawn(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Resolution(_) => "DNS",
            Self::ProbeTimeout(_) => "TIMEOUT",
            Self::ProbeIo(_) => "IO",
            Self::Spawn(_) => "SPAWN",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error terminates an entire diagnostic run.
    ///
    /// Only resolution and configuration failures are fatal; every
    /// probe-level failure is absorbed where it was detected and
    /// surfaces as a degraded score.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::Config(_))
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Resolution(_) => 2,
            Self::ProbeTimeout(_) => 3,
            Self::ProbeIo(_) | Self::Spawn(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Resolution(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::ProbeTimeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::ProbeIo(_) | Self::Spawn(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::probe_io(error.to_string())
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::resolution(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let resolution_error = AppError::resolution("no addresses");
        assert_eq!(resolution_error.category(), "DNS");
        assert!(resolution_error.is_fatal());
        assert_eq!(resolution_error.exit_code(), 2);

        let timeout_error = AppError::probe_timeout("hop probe");
        assert_eq!(timeout_error.category(), "TIMEOUT");
        assert!(!timeout_error.is_fatal());
        assert_eq!(timeout_error.exit_code(), 3);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::config("missing target domain");
        let display = error.to_string();
        assert!(display.contains("Configuration error"));
        assert!(display.contains("missing target domain"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::resolution("dns"),
            AppError::probe_timeout("timeout"),
            AppError::probe_io("io"),
            AppError::spawn("spawn"),
            AppError::parse("parse"),
            AppError::internal("internal"),
        ];

        let expected = ["CONFIG", "DNS", "TIMEOUT", "IO", "SPAWN", "PARSE", "INTERNAL"];

        for (error, expected) in errors.iter().zip(expected.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::resolution("test").is_fatal());
        assert!(AppError::config("test").is_fatal());

        assert!(!AppError::probe_timeout("test").is_fatal());
        assert!(!AppError::probe_io("test").is_fatal());
        assert!(!AppError::spawn("test").is_fatal());
        assert!(!AppError::parse("test").is_fatal());
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::resolution("lookup failed");
        let plain = error.format_for_console(false);
        let colored = error.format_for_console(true);

        assert!(plain.contains("[DNS]"));
        assert!(plain.contains("lookup failed"));
        assert!(colored.contains("lookup failed"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "nan".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let addr_error = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        let app_error: AppError = addr_error.into();
        assert_eq!(app_error.category(), "PARSE");
    }
}
