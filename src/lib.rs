//! Network Health Diagnostic
//!
//! A mobile network-health diagnostic engine: resolves a target domain,
//! measures TCP reachability and round-trip latency to each resolved
//! address, traces the network path hop by hop, and turns the results
//! into human-readable logs plus normalized 0-100 health scores.

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod ping;
pub mod probe;
pub mod stats;
pub mod tcp;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use config::DiagConfig;
pub use error::{AppError, Result};
pub use event::{DiagnosticEvent, EventSender};
pub use models::{PingReport, RunSummary, Target, TcpReport, TraceReport};
pub use orchestrator::DiagnosticOrchestrator;
pub use types::{NetworkType, ProbeKind, ProbeOutput, RttSample};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TARGET_DOMAIN: &str = "www.google.com";
    pub const DEFAULT_PING_COUNT: u32 = 4;
    /// TCP connect attempts per address
    pub const CONN_TIMES: u32 = 4;
    pub const TCP_PORT: u16 = 80;
    pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_millis(6000);
    /// Timeout growth after each timed-out TCP attempt
    pub const TCP_TIMEOUT_INCREMENT: Duration = Duration::from_millis(4000);
    pub const DEFAULT_HOP_LIMIT: u32 = 15;
    /// Tight per-hop budget; most hops drop oversized TTL probes
    pub const HOP_PROBE_TIMEOUT: Duration = Duration::from_millis(460);
    pub const GENERAL_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);
    /// Pool-wide maximum wait for one diagnostic run
    pub const RUN_TIMEOUT: Duration = Duration::from_secs(600);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_NETWORK_TYPE: &str = "WIFI";
}
