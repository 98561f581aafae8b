//! Type definitions and aliases

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// The three probe families a diagnostic run fans out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    /// ICMP-style ping measurement via the external ping utility
    Ping,
    /// Short-lived TCP connect attempts to port 80
    Tcp,
    /// TTL-incrementing traceroute emulation
    Trace,
}

impl ProbeKind {
    /// Get a human-readable name for this probe family
    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
            ProbeKind::Tcp => "tcp",
            ProbeKind::Trace => "traceroute",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One measured round-trip time, or the sentinel describing why the
/// measurement failed. Timeouts and I/O errors are kept distinct because
/// they are scored and narrated differently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RttSample {
    /// Successful measurement, round-trip time in milliseconds
    Ok(f64),
    /// The attempt exceeded its timeout budget
    Timeout,
    /// The attempt failed with an I/O error before the timeout fired
    IoError,
}

impl RttSample {
    /// RTT in milliseconds for successful samples
    pub fn rtt_ms(&self) -> Option<f64> {
        match self {
            RttSample::Ok(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RttSample::Ok(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RttSample::Timeout)
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, RttSample::IoError)
    }
}

/// Result of one external ping-equivalent invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutput {
    /// Raw console text drained from the process
    Text(String),
    /// The process outlived its timeout and was killed; carries the
    /// literal target host for narrative purposes
    Timeout { host: String },
    /// Spawn failure or interrupted wait; treated as "no data"
    Error(String),
}

impl ProbeOutput {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeOutput::Timeout { .. })
    }

    /// Raw text if the probe produced any
    pub fn text(&self) -> Option<&str> {
        match self {
            ProbeOutput::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Network-type label consumed from the host collaborator.
///
/// Only the Wi-Fi/cellular distinction matters to the engine (the
/// gateway is pinged on Wi-Fi only); anything else is narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Wifi,
    Cellular,
    Other(String),
}

impl NetworkType {
    /// Parse the collaborator's label string ("WIFI", "4G", ...)
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "WIFI" | "WI-FI" => NetworkType::Wifi,
            "2G" | "3G" | "4G" | "5G" | "LTE" | "CELLULAR" | "MOBILE" => NetworkType::Cellular,
            other => NetworkType::Other(other.to_string()),
        }
    }

    pub fn is_wifi(&self) -> bool {
        matches!(self, NetworkType::Wifi)
    }

    pub fn label(&self) -> &str {
        match self {
            NetworkType::Wifi => "WIFI",
            NetworkType::Cellular => "CELLULAR",
            NetworkType::Other(s) => s.as_str(),
        }
    }
}

/// Clamp a raw score contribution to the documented [0,100] band
pub fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}
