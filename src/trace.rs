//! TTL-incrementing traceroute emulation built on the external ping
//! utility.
//!
//! Each run owns its tracer; two concurrent traces share nothing. A
//! single trace is strictly sequential because hop N must complete
//! before hop N+1 is probed, but traces against different addresses of
//! the same target run side by side.

use crate::event::EventSender;
use crate::models::{HopRecord, TraceReport};
use crate::ping::extract_rtt_ms;
use crate::probe::ProbeRunner;
use crate::stats::RttStats;
use crate::types::{clamp_score, ProbeOutput, RttSample};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::lookup_host;

const CANNOT_RESOLVE: &str = "cannot resolve host, traceroute aborted";
const ILLEGAL_HOST: &str = "illegal host or network error, traceroute terminated";

/// Traceroute emulator for one target address. Constructed per run;
/// holds the compiled hop patterns and the per-hop timing budget.
pub struct TraceRouter {
    runner: Arc<dyn ProbeRunner>,
    hop_limit: u32,
    hop_timeout: Duration,
    reping_timeout: Duration,
    final_hop: Regex,
    intermediate_hop: Regex,
}

impl TraceRouter {
    pub fn new(
        runner: Arc<dyn ProbeRunner>,
        hop_limit: u32,
        hop_timeout: Duration,
        reping_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            hop_limit,
            hop_timeout,
            reping_timeout,
            // "64 bytes from 203.0.113.9: icmp_seq=1 ttl=55 time=..."
            // IPv4 only; an IPv6 reply carries ':' inside the address
            // itself and cannot be split on the same terminator.
            final_hop: Regex::new(r"from ([0-9.]+)[:\s].*icmp_seq=\d+ ttl=")
                .expect("final hop pattern"),
            // "From 10.0.0.1 icmp_seq=1 Time to live exceeded"
            intermediate_hop: Regex::new(r"From ([0-9.]+)[:\s]")
                .expect("intermediate hop pattern"),
        }
    }

    /// Trace the path to `target`, emitting one log line per hop and a
    /// final analysis block.
    pub async fn trace(&self, target: &str, events: &EventSender) -> TraceReport {
        // Verify the target resolves before spawning anything.
        let target_addr = match resolve_target(target).await {
            Some(addr) => addr,
            None => {
                let narrative = format!("{}: {}\n", CANNOT_RESOLVE, target);
                events.trace_update(Some(target.to_string()), narrative.clone());
                return empty_report(target, narrative);
            }
        };

        events.trace_update(
            Some(target.to_string()),
            format!("traceroute to {} ({}), {} hops max\n", target, target_addr, self.hop_limit),
        );

        let mut hops: Vec<HopRecord> = Vec::new();
        let mut valid_hops = 0u32;
        let mut timeout_hops = 0u32;
        let mut rtts: Vec<f64> = Vec::new();
        let mut scores: Vec<u32> = Vec::new();
        let mut log = String::new();
        let mut reached_target = false;
        let mut forced_stop = false;

        for hop_index in 1..=self.hop_limit {
            let output = self
                .runner
                .run(&target_addr, 1, Some(hop_index), false, self.hop_timeout)
                .await;

            let text = match output {
                ProbeOutput::Text(ref text) if text.trim().is_empty() => {
                    log.push_str(&format!("{}\n", ILLEGAL_HOST));
                    forced_stop = true;
                    break;
                }
                ProbeOutput::Text(text) => text,
                ProbeOutput::Timeout { .. } | ProbeOutput::Error(_) => {
                    // A silent hop is logged and skipped; it never
                    // counts toward the valid hop denominator.
                    log.push_str(&format!("hop {}: *\n", hop_index));
                    hops.push(HopRecord {
                        hop: hop_index,
                        address: None,
                        rtt: RttSample::Timeout,
                        score: 0,
                    });
                    continue;
                }
            };

            let hop_addr = match self.extract_hop_address(&text) {
                Some(addr) => addr,
                None => {
                    log.push_str(&format!("hop {}: unresolved\n", hop_index));
                    hops.push(HopRecord {
                        hop: hop_index,
                        address: None,
                        rtt: RttSample::Timeout,
                        score: 0,
                    });
                    continue;
                }
            };

            // Re-ping the discovered hop for its own RTT, independent
            // of the TTL probe's timing.
            valid_hops += 1;
            let rtt = match self
                .runner
                .run(&hop_addr, 1, None, false, self.reping_timeout)
                .await
            {
                ProbeOutput::Text(ref reply) if reply.trim().is_empty() => {
                    log.push_str(&format!("{}\n", ILLEGAL_HOST));
                    forced_stop = true;
                    // The hop itself stays recorded as a timeout.
                    timeout_hops += 1;
                    RttSample::Timeout
                }
                ProbeOutput::Text(reply) => match first_rtt(&reply) {
                    Some(ms) => {
                        rtts.push(ms);
                        RttSample::Ok(ms)
                    }
                    None => {
                        timeout_hops += 1;
                        RttSample::Timeout
                    }
                },
                ProbeOutput::Timeout { .. } => {
                    timeout_hops += 1;
                    RttSample::Timeout
                }
                ProbeOutput::Error(_) => {
                    timeout_hops += 1;
                    RttSample::IoError
                }
            };

            let score = hop_score(rtt.rtt_ms(), timeout_hops, valid_hops);
            scores.push(score as u32);

            match rtt.rtt_ms() {
                Some(ms) => log.push_str(&format!(
                    "hop {}: {}, {:.1} ms (score {})\n",
                    hop_index, hop_addr, ms, score
                )),
                None => log.push_str(&format!(
                    "hop {}: {}, no reply (score {})\n",
                    hop_index, hop_addr, score
                )),
            }

            hops.push(HopRecord {
                hop: hop_index,
                address: Some(hop_addr.clone()),
                rtt,
                score,
            });

            if forced_stop {
                break;
            }
            if hop_addr == target_addr {
                reached_target = true;
                break;
            }
        }

        let successful_hops = valid_hops - timeout_hops;
        let stats = RttStats::from_values(&rtts);
        let score = aggregate_score(&scores);

        let mut report = TraceReport {
            target: target.to_string(),
            hops,
            valid_hops,
            successful_hops,
            timeout_hops,
            stats,
            score,
            narrative: log,
        };
        let analysis = analysis_block(&report, reached_target);
        report.narrative.push_str(&analysis);

        events.trace_update(Some(target.to_string()), report.narrative.clone());
        report
    }

    /// Pull the responding hop address out of ping output. The final
    /// target's echo reply is checked first because it also contains a
    /// lowercase "from" marker.
    fn extract_hop_address(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.final_hop.captures(text) {
            return Some(caps[1].to_string());
        }
        self.intermediate_hop
            .captures(text)
            .map(|caps| caps[1].to_string())
    }
}

async fn resolve_target(target: &str) -> Option<String> {
    // Port is irrelevant, lookup_host just needs the pair.
    lookup_host((target, 0))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip().to_string())
}

fn first_rtt(reply: &str) -> Option<f64> {
    reply.lines().find_map(extract_rtt_ms)
}

fn empty_report(target: &str, narrative: String) -> TraceReport {
    TraceReport {
        target: target.to_string(),
        hops: Vec::new(),
        valid_hops: 0,
        successful_hops: 0,
        timeout_hops: 0,
        stats: None,
        score: 0,
        narrative,
    }
}

/// Score one valid hop. Starts at 100, drops with RTT degradation and
/// with the accumulated timeout ratio along the path so far.
pub fn hop_score(rtt_ms: Option<f64>, timeouts_so_far: u32, valid_hops_so_far: u32) -> u8 {
    let mut score = 100i32;
    if let Some(ms) = rtt_ms {
        if ms >= 300.0 {
            score -= 20;
        } else if ms >= 100.0 {
            score -= 10;
        }
    }
    if valid_hops_so_far > 0 {
        score -= (10 * timeouts_so_far / valid_hops_so_far) as i32;
    }
    clamp_score(score)
}

/// Mean of per-hop scores, 0 when no hop was ever valid
pub fn aggregate_score(scores: &[u32]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let mean = scores.iter().sum::<u32>() / scores.len() as u32;
    clamp_score(mean as i32)
}

/// True when the last hop that yielded an address also answered its
/// re-ping.
fn last_hop_responded(report: &TraceReport) -> bool {
    report
        .hops
        .iter()
        .rev()
        .find(|hop| hop.address.is_some())
        .map_or(false, |hop| hop.rtt.is_ok())
}

/// Analysis block appended after the per-hop log
fn analysis_block(report: &TraceReport, reached_target: bool) -> String {
    let mut block = String::from("\ntraceroute analysis:\n");

    let discovered = report.discovered_addresses();
    if discovered.is_empty() {
        block.push_str("no responding hops discovered\n");
    } else {
        block.push_str(&format!("discovered hops: {}\n", discovered.join(", ")));
    }

    block.push_str(&format!(
        "valid hops: {}, responded: {}, timed out: {}\n",
        report.valid_hops, report.successful_hops, report.timeout_hops
    ));

    if let Some(rate) = report.timeout_rate() {
        block.push_str(&format!("timeout rate: {:.0}%\n", rate));
        if rate < 10.0 {
            block.push_str("path stability: good, few lost probes\n");
        } else if rate <= 50.0 {
            block.push_str("path stability: moderate, some hops dropped probes\n");
        } else {
            block.push_str("path stability: poor, most hops dropped probes\n");
        }
    }

    if report.valid_hops > 0 && report.timeout_hops == report.valid_hops {
        block.push_str(
            "every discovered hop dropped its probe; the path is likely unreachable or traceroute is blocked\n",
        );
    } else if report.timeout_hops > 0 && last_hop_responded(report) {
        block.push_str(
            "intermediate hops filter probes but the last hop answered; the target is still reachable\n",
        );
    }

    if let Some(stats) = &report.stats {
        block.push_str(&format!(
            "hop RTT: min {:.1} ms, avg {:.1} ms, max {:.1} ms\n",
            stats.min_ms, stats.avg_ms, stats.max_ms
        ));
        if stats.max_ms < 100.0 {
            block.push_str("worst hop latency: low\n");
        } else if stats.max_ms <= 500.0 {
            block.push_str("worst hop latency: elevated on at least one hop\n");
        } else {
            block.push_str("worst hop latency: severe on at least one hop\n");
        }
    }

    if reached_target {
        block.push_str("target reached\n");
    } else if report.valid_hops > 0 {
        block.push_str("target not reached within the hop limit\n");
    }

    block.push_str(&format!("path score: {} / 100\n", report.score));
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeRunner;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedRunner {
        outputs: Mutex<VecDeque<ProbeOutput>>,
        sized_flags: Mutex<Vec<bool>>,
    }

    impl ScriptedRunner {
        fn new(outputs: Vec<ProbeOutput>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                sized_flags: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProbeRunner for ScriptedRunner {
        async fn run(
            &self,
            host: &str,
            _count: u32,
            _ttl: Option<u32>,
            sized: bool,
            _timeout: Duration,
        ) -> ProbeOutput {
            self.sized_flags.lock().unwrap().push(sized);
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ProbeOutput::Timeout {
                    host: host.to_string(),
                })
        }
    }

    fn tracer(runner: Arc<dyn ProbeRunner>) -> TraceRouter {
        TraceRouter::new(
            runner,
            15,
            Duration::from_millis(460),
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn test_hop_score_rtt_bands() {
        assert_eq!(hop_score(Some(50.0), 0, 1), 100);
        assert_eq!(hop_score(Some(150.0), 0, 1), 90);
        assert_eq!(hop_score(Some(400.0), 0, 1), 80);
    }

    #[test]
    fn test_hop_score_timeout_ratio_uses_integer_division() {
        // 10 * 1 / 3 = 3
        assert_eq!(hop_score(Some(50.0), 1, 3), 97);
        // 10 * 2 / 2 = 10
        assert_eq!(hop_score(None, 2, 2), 90);
    }

    #[test]
    fn test_aggregate_score_empty_is_zero() {
        assert_eq!(aggregate_score(&[]), 0);
        assert_eq!(aggregate_score(&[100, 90, 80]), 90);
    }

    #[test]
    fn test_extract_final_hop_address() {
        let t = tracer(ScriptedRunner::new(vec![]));
        let reply = "64 bytes from 203.0.113.9: icmp_seq=1 ttl=55 time=10.2 ms";
        assert_eq!(t.extract_hop_address(reply), Some("203.0.113.9".to_string()));
    }

    #[test]
    fn test_extract_intermediate_hop_address() {
        let t = tracer(ScriptedRunner::new(vec![]));
        let reply = "From 10.0.0.1 icmp_seq=1 Time to live exceeded";
        assert_eq!(t.extract_hop_address(reply), Some("10.0.0.1".to_string()));
        assert_eq!(t.extract_hop_address("no markers here"), None);
    }

    #[test]
    fn test_ipv6_reply_is_not_mistaken_for_a_hop_address() {
        // A ':' inside the address must not yield a truncated capture
        // like "2001".
        let t = tracer(ScriptedRunner::new(vec![]));
        let reply = "64 bytes from 2001:db8::1: icmp_seq=1 ttl=55 time=1.0 ms";
        assert_eq!(t.extract_hop_address(reply), None);
        assert_eq!(
            t.extract_hop_address("From 2001:db8::1 icmp_seq=1 Time to live exceeded"),
            None
        );
    }

    #[tokio::test]
    async fn test_unresolvable_target_scores_zero_without_probing() {
        let runner = ScriptedRunner::new(vec![]);
        let t = tracer(runner.clone());
        let (events, mut rx) = EventSender::channel();

        let report = t
            .trace("definitely-not-a-real-host.invalid", &events)
            .await;
        assert_eq!(report.score, 0);
        assert!(report.hops.is_empty());
        assert!(report.narrative.contains("cannot resolve host"));
        // No scripted output was consumed, so no probe ran.
        assert!(runner.outputs.lock().unwrap().is_empty());
        assert!(rx.recv().await.unwrap().text().unwrap().contains("cannot resolve host"));
    }

    #[tokio::test]
    async fn test_trace_terminates_when_hop_matches_target() {
        let outputs = vec![
            // hop 1 TTL probe
            ProbeOutput::Text("From 10.0.0.1 icmp_seq=1 Time to live exceeded".into()),
            // hop 1 re-ping
            ProbeOutput::Text("64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=3.1 ms".into()),
            // hop 2 TTL probe reaches the target itself
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.4 ms".into()),
            // hop 2 re-ping
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.5 ms".into()),
        ];
        let t = tracer(ScriptedRunner::new(outputs));
        let (events, _rx) = EventSender::channel();

        let report = t.trace("127.0.0.1", &events).await;
        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.valid_hops, 2);
        assert_eq!(report.timeout_hops, 0);
        assert_eq!(report.score, 100);
        assert!(report.narrative.contains("target reached"));
    }

    #[tokio::test]
    async fn test_silent_hops_do_not_terminate_the_trace() {
        let outputs = vec![
            // hop 1 times out entirely
            ProbeOutput::Timeout {
                host: "127.0.0.1".into(),
            },
            // hop 2 reaches the target
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.4 ms".into()),
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.5 ms".into()),
        ];
        let t = tracer(ScriptedRunner::new(outputs));
        let (events, _rx) = EventSender::channel();

        let report = t.trace("127.0.0.1", &events).await;
        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.hops[0].address, None);
        // Only the second hop counts as valid.
        assert_eq!(report.valid_hops, 1);
        assert!(report.narrative.contains("hop 1: *"));
    }

    #[tokio::test]
    async fn test_ttl_probes_are_plain_unsized_echoes() {
        let outputs = vec![
            // hop 1 TTL probe reaches the target
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.4 ms".into()),
            // hop 1 re-ping
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.5 ms".into()),
        ];
        let runner = ScriptedRunner::new(outputs);
        let t = tracer(runner.clone());
        let (events, _rx) = EventSender::channel();

        t.trace("127.0.0.1", &events).await;
        // Neither the TTL probe nor the re-ping carries the payload flag.
        assert_eq!(*runner.sized_flags.lock().unwrap(), vec![false, false]);
    }

    #[tokio::test]
    async fn test_all_hops_timing_out_reports_path_unreachable() {
        let outputs = vec![
            // hop 1 TTL probe discovers a router
            ProbeOutput::Text("From 10.0.0.1 icmp_seq=1 Time to live exceeded".into()),
            // hop 1 re-ping never answers
            ProbeOutput::Timeout {
                host: "10.0.0.1".into(),
            },
            // every later hop stays silent (scripted default)
        ];
        let t = tracer(ScriptedRunner::new(outputs));
        let (events, _rx) = EventSender::channel();

        let report = t.trace("127.0.0.1", &events).await;
        assert_eq!(report.valid_hops, 1);
        assert_eq!(report.timeout_hops, 1);
        assert!(report.narrative.contains("path is likely unreachable"));
        assert!(!report.narrative.contains("still reachable"));
    }

    #[tokio::test]
    async fn test_filtered_path_with_answering_last_hop_stays_reachable() {
        let outputs = vec![
            // hop 1 discovered but its re-ping times out
            ProbeOutput::Text("From 10.0.0.1 icmp_seq=1 Time to live exceeded".into()),
            ProbeOutput::Timeout {
                host: "10.0.0.1".into(),
            },
            // hop 2 is the target and answers its re-ping
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.4 ms".into()),
            ProbeOutput::Text("64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.5 ms".into()),
        ];
        let t = tracer(ScriptedRunner::new(outputs));
        let (events, _rx) = EventSender::channel();

        let report = t.trace("127.0.0.1", &events).await;
        assert_eq!(report.valid_hops, 2);
        assert_eq!(report.timeout_hops, 1);
        assert!(report.narrative.contains("target reached"));
        assert!(report.narrative.contains("the target is still reachable"));
        assert!(!report.narrative.contains("path is likely unreachable"));
    }

    #[tokio::test]
    async fn test_empty_probe_output_forces_termination() {
        let outputs = vec![ProbeOutput::Text("   ".into())];
        let t = tracer(ScriptedRunner::new(outputs));
        let (events, _rx) = EventSender::channel();

        let report = t.trace("127.0.0.1", &events).await;
        assert!(report.hops.is_empty());
        assert_eq!(report.score, 0);
        assert!(report.narrative.contains("illegal host"));
    }
}
