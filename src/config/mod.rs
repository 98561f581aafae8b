//! Configuration data model and validation

use crate::types::{AppError, NetworkType, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main diagnostic engine configuration.
///
/// Collaborator inputs (local IP, gateway, network-type and carrier
/// labels) are consumed as plain strings; collecting them is the host's
/// job, not the engine's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagConfig {
    /// Target domain to diagnose
    #[serde(default = "default_target_domain")]
    pub target_domain: String,

    /// Echo count per ping invocation
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// TCP connect attempts per address
    #[serde(default = "default_conn_times")]
    pub conn_times: u32,

    /// TCP connect port
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Initial TCP connect timeout in milliseconds
    #[serde(default = "default_tcp_timeout_ms")]
    pub tcp_timeout_ms: u64,

    /// Timeout growth after each timed-out TCP attempt, milliseconds
    #[serde(default = "default_tcp_timeout_increment_ms")]
    pub tcp_timeout_increment_ms: u64,

    /// Traceroute hop upper bound
    #[serde(default = "default_hop_limit")]
    pub hop_limit: u32,

    /// Per-hop TTL probe timeout in milliseconds
    #[serde(default = "default_hop_timeout_ms")]
    pub hop_timeout_ms: u64,

    /// General probe timeout (ping invocations) in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Pool-wide maximum wait for one run, in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Run the three probe families in order instead of concurrently
    #[serde(default)]
    pub sequential: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Local IP string from the host collaborator
    #[serde(default)]
    pub local_ip: Option<String>,

    /// Gateway string from the host collaborator (Wi-Fi only)
    #[serde(default)]
    pub gateway: Option<String>,

    /// Network-type label from the host collaborator
    #[serde(default = "default_network_type")]
    pub network_type: String,

    /// Carrier/country label, narrative only
    #[serde(default)]
    pub carrier: Option<String>,
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self {
            target_domain: default_target_domain(),
            ping_count: default_ping_count(),
            conn_times: default_conn_times(),
            tcp_port: default_tcp_port(),
            tcp_timeout_ms: default_tcp_timeout_ms(),
            tcp_timeout_increment_ms: default_tcp_timeout_increment_ms(),
            hop_limit: default_hop_limit(),
            hop_timeout_ms: default_hop_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            run_timeout_secs: default_run_timeout_secs(),
            sequential: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            local_ip: None,
            gateway: None,
            network_type: default_network_type(),
            carrier: None,
        }
    }
}

impl DiagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TCP connect timeout as Duration
    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_millis(self.tcp_timeout_ms)
    }

    /// Per-hop TTL probe timeout as Duration
    pub fn hop_timeout(&self) -> Duration {
        Duration::from_millis(self.hop_timeout_ms)
    }

    /// General probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Pool-wide run guard as Duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Parsed network-type label
    pub fn network_type(&self) -> NetworkType {
        NetworkType::from_label(&self.network_type)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.target_domain.trim().is_empty() {
            return Err(AppError::config("Target domain cannot be empty"));
        }

        if self.ping_count == 0 || self.ping_count > 64 {
            return Err(AppError::config("Ping count must be in 1..=64"));
        }

        if self.conn_times == 0 || self.conn_times > 16 {
            return Err(AppError::config("TCP connect attempt count must be in 1..=16"));
        }

        if self.hop_limit == 0 || self.hop_limit > 30 {
            return Err(AppError::config("Hop limit must be in 1..=30"));
        }

        if self.hop_timeout_ms == 0 || self.probe_timeout_ms == 0 || self.tcp_timeout_ms == 0 {
            return Err(AppError::config("Timeouts must be greater than 0"));
        }

        if self.run_timeout_secs == 0 {
            return Err(AppError::config("Run timeout must be greater than 0"));
        }

        if let Some(local_ip) = &self.local_ip {
            if local_ip.parse::<std::net::IpAddr>().is_err() {
                return Err(AppError::config(format!("Invalid local IP: {}", local_ip)));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(domain) = std::env::var("NETDIAG_TARGET") {
            if !domain.trim().is_empty() {
                self.target_domain = domain.trim().to_string();
            }
        }

        if let Ok(count) = std::env::var("NETDIAG_PING_COUNT") {
            self.ping_count = count
                .parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_PING_COUNT '{}': {}", count, e)))?;
        }

        if let Ok(hop_limit) = std::env::var("NETDIAG_HOP_LIMIT") {
            self.hop_limit = hop_limit
                .parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_HOP_LIMIT '{}': {}", hop_limit, e)))?;
        }

        if let Ok(timeout) = std::env::var("NETDIAG_RUN_TIMEOUT_SECS") {
            self.run_timeout_secs = timeout
                .parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_RUN_TIMEOUT_SECS '{}': {}", timeout, e)))?;
        }

        if let Ok(enable_color) = std::env::var("NETDIAG_COLOR") {
            self.enable_color = enable_color
                .parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_COLOR '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_target_domain() -> String {
    crate::defaults::DEFAULT_TARGET_DOMAIN.to_string()
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_conn_times() -> u32 {
    crate::defaults::CONN_TIMES
}

fn default_tcp_port() -> u16 {
    crate::defaults::TCP_PORT
}

fn default_tcp_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_TCP_TIMEOUT.as_millis() as u64
}

fn default_tcp_timeout_increment_ms() -> u64 {
    crate::defaults::TCP_TIMEOUT_INCREMENT.as_millis() as u64
}

fn default_hop_limit() -> u32 {
    crate::defaults::DEFAULT_HOP_LIMIT
}

fn default_hop_timeout_ms() -> u64 {
    crate::defaults::HOP_PROBE_TIMEOUT.as_millis() as u64
}

fn default_probe_timeout_ms() -> u64 {
    crate::defaults::GENERAL_PROBE_TIMEOUT.as_millis() as u64
}

fn default_run_timeout_secs() -> u64 {
    crate::defaults::RUN_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_network_type() -> String {
    crate::defaults::DEFAULT_NETWORK_TYPE.to_string()
}
