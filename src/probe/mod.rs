//! External probe invocation layer.
//!
//! The engine never touches raw ICMP sockets; it models the OS `ping`
//! utility as a black box that returns parseable text or times out.
//! Everything above this trait (parsing, scoring, orchestration) is
//! oblivious to how the probe is actually performed, so a raw-socket
//! prober can be swapped in later without touching scoring logic, and
//! tests inject canned output to pin down parsing behavior.

pub mod system;

pub use system::SystemPingRunner;

use crate::types::ProbeOutput;
use async_trait::async_trait;
use std::time::Duration;

/// Black-box probe command abstraction
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Invoke the ping-equivalent command against `host`.
    ///
    /// `count` is the echo count, `ttl` restricts the probe's time-to-
    /// live for traceroute emulation, `sized` requests the large fixed
    /// packet size. The invocation is force-terminated once `timeout`
    /// elapses and reported as `ProbeOutput::Timeout`.
    async fn run(
        &self,
        host: &str,
        count: u32,
        ttl: Option<u32>,
        sized: bool,
        timeout: Duration,
    ) -> ProbeOutput;
}
