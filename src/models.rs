//! Data model for diagnostic runs: targets, hop records and reports

use crate::stats::{AttemptCounts, RttStats};
use crate::types::RttSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// One resolved address of the diagnostic target. Captured once at the
/// start of a run; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Resolved IP address
    pub ip: IpAddr,
    /// Display string forwarded into narratives
    pub display: String,
}

impl Address {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            display: ip.to_string(),
            ip,
        }
    }
}

/// The diagnostic target: a domain plus its point-in-time resolution
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Domain name (fixed diagnostic endpoint)
    pub domain: String,
    /// Addresses resolved for this run
    pub addresses: Vec<Address>,
    /// How long resolution took
    pub resolve_duration: Duration,
}

impl Target {
    pub fn new(domain: String, ips: Vec<IpAddr>, resolve_duration: Duration) -> Self {
        Self {
            domain,
            addresses: ips.into_iter().map(Address::new).collect(),
            resolve_duration,
        }
    }

    /// Display strings of all resolved addresses
    pub fn ip_strings(&self) -> Vec<String> {
        self.addresses.iter().map(|a| a.display.clone()).collect()
    }
}

/// One discovered step of a traceroute emulation, ordered by hop index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopRecord {
    /// Hop index, starting at 1
    pub hop: u32,
    /// Responding address, or `None` for an unresolved/timed-out hop
    pub address: Option<String>,
    /// RTT measured by the follow-up single-echo ping against the hop
    pub rtt: RttSample,
    /// Per-hop score in [0,100]
    pub score: u8,
}

/// Ping analysis result for one target host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingReport {
    /// Host that was pinged
    pub host: String,
    /// Explanatory prefix for the test point (self-stack, router, ...)
    pub preset_label: String,
    /// Packet loss percentage parsed from the summary line
    pub packet_loss_pct: u32,
    /// RTT moments, preferred from the tool's own statistics line;
    /// `None` when nothing succeeded or the line was missing
    pub stats: Option<RttStats>,
    /// Per-line success / failure marker counts
    pub successful_pings: u32,
    pub failed_pings: u32,
    /// Composite 0-100 score
    pub score: u8,
    /// Human-readable analysis block
    pub narrative: String,
}

/// Connection attempt outcomes for a single address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpAddressReport {
    /// Address that was probed
    pub address: String,
    /// Per-attempt outcomes, indexed by attempt number
    pub samples: Vec<RttSample>,
    /// Tallied counters
    pub counts: AttemptCounts,
    /// Average RTT over successful attempts
    pub avg_rtt_ms: Option<f64>,
    /// Per-address connection narrative
    pub narrative: String,
}

impl TcpAddressReport {
    /// Whether at least one attempt connected
    pub fn connected(&self) -> bool {
        self.counts.success > 0
    }
}

/// Aggregate TCP connect probe result across all addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpReport {
    /// Per-address breakdowns
    pub per_address: Vec<TcpAddressReport>,
    /// Batch-wide 0-100 score
    pub score: u8,
    /// Aggregate narrative
    pub narrative: String,
}

/// Traceroute emulation result for one target address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReport {
    /// Target the trace ran against
    pub target: String,
    /// Ordered hop records, including unresolved/timed-out hops
    pub hops: Vec<HopRecord>,
    /// Hops for which an address was actually extracted
    pub valid_hops: u32,
    /// Valid hops that yielded an RTT
    pub successful_hops: u32,
    /// Valid hops that timed out
    pub timeout_hops: u32,
    /// RTT summary over valid hop pings
    pub stats: Option<RttStats>,
    /// Mean of per-hop scores, 0 with no valid hops
    pub score: u8,
    /// Full per-hop log plus analysis report
    pub narrative: String,
}

impl TraceReport {
    /// Timeout rate over valid hops, `None` when no hop was valid
    pub fn timeout_rate(&self) -> Option<f64> {
        if self.valid_hops == 0 {
            None
        } else {
            Some(self.timeout_hops as f64 / self.valid_hops as f64 * 100.0)
        }
    }

    /// Distinct addresses discovered along the path, in hop order
    pub fn discovered_addresses(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for hop in &self.hops {
            if let Some(addr) = &hop.address {
                if !seen.contains(addr) {
                    seen.push(addr.clone());
                }
            }
        }
        seen
    }
}

/// Final summary of one diagnostic run, built append-only while the run
/// progresses and finalized once every probe family completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Domain the run diagnosed
    pub domain: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Per-family scores; `None` when a family never reported
    pub ping_score: Option<u8>,
    pub tcp_score: Option<u8>,
    pub trace_score: Option<u8>,
    /// Concatenated log of every narrative line emitted during the run
    pub log: String,
}

impl RunSummary {
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            started_at: Utc::now(),
            ping_score: None,
            tcp_score: None,
            trace_score: None,
            log: String::new(),
        }
    }

    /// Append a narrative line to the run log
    pub fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
        if !text.ends_with('\n') {
            self.log.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_target_ip_strings() {
        let target = Target::new(
            "example.com".to_string(),
            vec![
                IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)),
                IpAddr::V4(Ipv4Addr::new(93, 184, 216, 35)),
            ],
            Duration::from_millis(12),
        );
        assert_eq!(target.ip_strings(), vec!["93.184.216.34", "93.184.216.35"]);
    }

    #[test]
    fn test_trace_report_timeout_rate() {
        let mut report = TraceReport {
            target: "1.2.3.4".to_string(),
            hops: Vec::new(),
            valid_hops: 4,
            successful_hops: 3,
            timeout_hops: 1,
            stats: None,
            score: 90,
            narrative: String::new(),
        };
        assert_eq!(report.timeout_rate(), Some(25.0));

        report.valid_hops = 0;
        assert_eq!(report.timeout_rate(), None);
    }

    #[test]
    fn test_trace_report_distinct_addresses() {
        let hop = |n: u32, addr: Option<&str>| HopRecord {
            hop: n,
            address: addr.map(str::to_string),
            rtt: RttSample::Ok(1.0),
            score: 100,
        };
        let report = TraceReport {
            target: "t".to_string(),
            hops: vec![
                hop(1, Some("10.0.0.1")),
                hop(2, None),
                hop(3, Some("10.0.0.2")),
                hop(4, Some("10.0.0.1")),
            ],
            valid_hops: 3,
            successful_hops: 3,
            timeout_hops: 0,
            stats: None,
            score: 100,
            narrative: String::new(),
        };
        assert_eq!(report.discovered_addresses(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_run_summary_log_newlines() {
        let mut summary = RunSummary::new("example.com".to_string());
        summary.append_log("line one");
        summary.append_log("line two\n");
        assert_eq!(summary.log, "line one\nline two\n");
    }
}
