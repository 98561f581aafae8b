//! Scoring behavior tests across the probe components
//!
//! These tests drive the analyzers with canned probe output and real
//! loopback sockets, checking the documented score bands end to end.

use async_trait::async_trait;
use network_health_diag::config::DiagConfig;
use network_health_diag::event::EventSender;
use network_health_diag::models::Address;
use network_health_diag::ping::{packet_loss_score, PingAnalyzer};
use network_health_diag::probe::ProbeRunner;
use network_health_diag::stats::RttStats;
use network_health_diag::tcp::TcpConnectProbe;
use network_health_diag::trace::TraceRouter;
use network_health_diag::types::{clamp_score, ProbeOutput, RttSample};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Probe runner that returns the same canned output for every call
struct FixedRunner {
    output: String,
}

impl FixedRunner {
    fn new(output: &str) -> Arc<Self> {
        Arc::new(Self {
            output: output.to_string(),
        })
    }
}

#[async_trait]
impl ProbeRunner for FixedRunner {
    async fn run(
        &self,
        _host: &str,
        _count: u32,
        _ttl: Option<u32>,
        _sized: bool,
        _timeout: Duration,
    ) -> ProbeOutput {
        ProbeOutput::Text(self.output.clone())
    }
}

const HEALTHY_PING: &str = "\
PING example.com (93.184.216.34) 56(84) bytes of data.
64 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=28.1 ms
64 bytes from 93.184.216.34: icmp_seq=2 ttl=56 time=30.0 ms
64 bytes from 93.184.216.34: icmp_seq=3 ttl=56 time=31.9 ms
64 bytes from 93.184.216.34: icmp_seq=4 ttl=56 time=30.0 ms

--- example.com ping statistics ---
4 packets transmitted, 4 received, 0% packet loss, time 3004ms
rtt min/avg/max/mdev = 28.100/30.000/31.900/5.000 ms";

#[tokio::test]
async fn healthy_ping_scores_full_marks() {
    // 0% loss (10) + avg 30ms (15) + mdev 5ms (15) + 4/4 echoes (60)
    let analyzer = PingAnalyzer::new(
        FixedRunner::new(HEALTHY_PING),
        4,
        Duration::from_millis(1000),
    );
    let report = analyzer.analyze("target address", "93.184.216.34").await;

    assert_eq!(report.score, 100);
    assert_eq!(report.packet_loss_pct, 0);
    assert_eq!(report.successful_pings, 4);
    assert_eq!(report.failed_pings, 0);
    let stats = report.stats.expect("statistics line must be parsed");
    assert_eq!(stats.avg_ms, 30.0);
    assert_eq!(stats.mdev_ms, 5.0);
    assert!(report.narrative.contains("network score: 100 / 100"));
}

#[tokio::test]
async fn ping_with_no_output_scores_zero() {
    let analyzer = PingAnalyzer::new(FixedRunner::new(""), 4, Duration::from_millis(1000));
    let report = analyzer.analyze("target address", "10.9.9.9").await;

    assert_eq!(report.score, 0);
    assert!(report.narrative.contains("cannot compute"));
}

#[tokio::test]
async fn tcp_all_fast_connects_score_at_least_eighty() {
    // Real loopback listener; every connect succeeds in microseconds.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });

    let mut config = DiagConfig::default();
    config.tcp_port = port;
    let (events, _rx) = EventSender::channel();
    let probe = TcpConnectProbe::new(&config, events);

    let addresses = vec![Address::new(IpAddr::V4(Ipv4Addr::LOCALHOST))];
    let report = probe.probe(&addresses).await;

    assert!(report.score >= 80, "score was {}", report.score);
    assert_eq!(report.per_address.len(), 1);
    assert!(report.per_address[0].connected());
    assert!(report.per_address[0].avg_rtt_ms.is_some());
}

#[tokio::test]
async fn tcp_unreachable_address_scores_zero() {
    // TEST-NET-1 traffic is never routed; every attempt fails and the
    // consecutive-failure cutoff stops the attempt loop early.
    let mut config = DiagConfig::default();
    config.tcp_timeout_ms = 100;
    config.tcp_timeout_increment_ms = 50;
    let (events, _rx) = EventSender::channel();
    let probe = TcpConnectProbe::new(&config, events);

    let addresses = vec![Address::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))];
    let report = probe.probe(&addresses).await;

    assert_eq!(report.score, 0);
    assert!(!report.per_address[0].connected());
    assert!(report.per_address[0].avg_rtt_ms.is_none());
    assert!(report.narrative.contains("no successful connection"));
}

#[tokio::test]
async fn trace_to_unresolvable_host_scores_zero_without_probes() {
    let runner = FixedRunner::new("should never be consumed");
    let tracer = TraceRouter::new(
        runner,
        15,
        Duration::from_millis(460),
        Duration::from_millis(1000),
    );
    let (events, _rx) = EventSender::channel();

    let report = tracer
        .trace("surely-not-a-real-host.invalid", &events)
        .await;

    assert_eq!(report.score, 0);
    assert!(report.hops.is_empty());
    assert_eq!(report.valid_hops, 0);
    assert!(report.narrative.contains("cannot resolve host"));
}

#[test]
fn rtt_stats_reject_all_failed_sample_sets() {
    let all_failed = [RttSample::Timeout, RttSample::IoError];
    assert!(RttStats::from_samples(&all_failed).is_none());

    let mixed = [RttSample::Ok(10.0), RttSample::Timeout, RttSample::Ok(20.0)];
    let stats = RttStats::from_samples(&mixed).unwrap();
    assert_eq!(stats.sample_count, 2);
    assert!(stats.min_ms <= stats.avg_ms && stats.avg_ms <= stats.max_ms);
}

proptest! {
    #[test]
    fn packet_loss_score_is_monotone_and_banded(a in 0u32..=100, b in 0u32..=100) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(packet_loss_score(low) >= packet_loss_score(high));
        let score = packet_loss_score(a);
        prop_assert!((0..=10).contains(&score));
    }

    #[test]
    fn clamp_score_always_lands_in_band(raw in i32::MIN..=i32::MAX) {
        let clamped = clamp_score(raw);
        prop_assert!(clamped <= 100);
    }

    #[test]
    fn rtt_stats_moments_are_ordered(values in prop::collection::vec(0.1f64..5000.0, 1..64)) {
        let stats = RttStats::from_values(&values).unwrap();
        prop_assert!(stats.min_ms <= stats.avg_ms);
        prop_assert!(stats.avg_ms <= stats.max_ms);
        prop_assert!(stats.mdev_ms >= 0.0);
        prop_assert_eq!(stats.sample_count, values.len());
    }
}
