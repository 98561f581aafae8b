//! Ping output analysis and network-quality scoring

use crate::models::PingReport;
use crate::probe::ProbeRunner;
use crate::stats::RttStats;
use crate::types::{clamp_score, ProbeOutput};
use std::sync::Arc;
use std::time::Duration;

/// Parses the external ping output for one target into packet-loss,
/// RTT moments and per-echo success markers, then derives a 100-point
/// quality score. No failure escapes this component; missing or
/// malformed fields degrade the score and are noted in the narrative.
pub struct PingAnalyzer {
    runner: Arc<dyn ProbeRunner>,
    send_count: u32,
    timeout: Duration,
}

/// Fields extracted from one ping invocation's raw text
#[derive(Debug, Default, Clone)]
struct ParsedPing {
    rtt_samples: Vec<f64>,
    packet_loss_pct: Option<u32>,
    /// min/avg/max/mdev from the tool's own statistics line
    rtt_line: Option<(f64, f64, f64, f64)>,
    successful_pings: u32,
    failed_pings: u32,
}

impl PingAnalyzer {
    pub fn new(runner: Arc<dyn ProbeRunner>, send_count: u32, timeout: Duration) -> Self {
        Self {
            runner,
            send_count,
            timeout,
        }
    }

    /// Run one ping invocation against `host` and score the result.
    /// `preset_label` explains the test point and leads the narrative.
    pub async fn analyze(&self, preset_label: &str, host: &str) -> PingReport {
        // Quality-test echoes carry the fixed large payload; only the
        // traceroute probes go out unsized.
        let output = self
            .runner
            .run(host, self.send_count, None, true, self.timeout)
            .await;

        match output {
            ProbeOutput::Text(text) if !text.is_empty() => {
                let parsed = parse_ping_output(&text);
                self.score_and_narrate(preset_label, host, parsed)
            }
            ProbeOutput::Text(_) => self.no_data_report(
                preset_label,
                host,
                "ping produced no output (illegal host or network error)",
            ),
            ProbeOutput::Timeout { .. } => {
                self.no_data_report(preset_label, host, "ping timed out before producing output")
            }
            ProbeOutput::Error(e) => {
                self.no_data_report(preset_label, host, &format!("ping could not run: {}", e))
            }
        }
    }

    /// Report for a probe that yielded no text at all: score 0, explicit
    /// "cannot compute" narrative, nothing fabricated.
    fn no_data_report(&self, preset_label: &str, host: &str, reason: &str) -> PingReport {
        let mut narrative = String::with_capacity(128);
        narrative.push_str(preset_label);
        narrative.push('\n');
        narrative.push_str(&format!("ping {}: {}\n", host, reason));
        narrative.push_str("success ratio: cannot compute (no echoes sent or received)\n");
        narrative.push_str("network score: 0 / 100\n");

        PingReport {
            host: host.to_string(),
            preset_label: preset_label.to_string(),
            packet_loss_pct: 0,
            stats: None,
            successful_pings: 0,
            failed_pings: 0,
            score: 0,
            narrative,
        }
    }

    fn score_and_narrate(&self, preset_label: &str, host: &str, parsed: ParsedPing) -> PingReport {
        // Prefer the tool's own min/avg/max/mdev line over recomputing
        // from per-echo samples.
        let stats = match parsed.rtt_line {
            Some((min, avg, max, mdev)) => Some(RttStats {
                min_ms: min,
                avg_ms: avg,
                max_ms: max,
                mdev_ms: mdev,
                sample_count: parsed.rtt_samples.len().max(parsed.successful_pings as usize),
            }),
            None => RttStats::from_values(&parsed.rtt_samples),
        };

        let loss = parsed.packet_loss_pct.unwrap_or(0);
        let loss_component = packet_loss_score(loss);
        let avg_component = stats.as_ref().map_or(0, |s| avg_rtt_score(s.avg_ms));
        let mdev_component = stats.as_ref().map_or(0, |s| mdev_score(s.mdev_ms));

        let echo_total = parsed.successful_pings + parsed.failed_pings;
        let success_component = if echo_total == 0 {
            0
        } else {
            (60.0 * parsed.successful_pings as f64 / echo_total as f64) as i32
        };

        let total = clamp_score(loss_component + avg_component + mdev_component + success_component);

        let mut narrative = String::with_capacity(512);
        narrative.push_str(preset_label);
        narrative.push('\n');
        narrative.push_str(&format!("ping analysis for {}:\n", host));

        if echo_total == 0 {
            narrative.push_str("success ratio: cannot compute (no echo markers in output)\n");
        } else {
            narrative.push_str(&format!(
                "success ratio score: {} / 60 ({} of {} echoes answered)\n",
                success_component, parsed.successful_pings, echo_total
            ));
        }

        match parsed.packet_loss_pct {
            Some(loss) => narrative.push_str(&format!(
                "packet loss score: {} / 10 (loss: {}%, {})\n",
                loss_component,
                loss,
                classify_loss(loss)
            )),
            None => narrative.push_str("packet loss: unavailable (summary line missing)\n"),
        }

        match &stats {
            Some(stats) => {
                narrative.push_str(&format!(
                    "average RTT score: {} / 15 (avg: {}, {})\n",
                    avg_component,
                    RttStats::format_rtt(stats.avg_ms),
                    classify_avg_rtt(stats.avg_ms)
                ));
                narrative.push_str(&format!(
                    "RTT jitter score: {} / 15 (mdev: {}, {})\n",
                    mdev_component,
                    RttStats::format_rtt(stats.mdev_ms),
                    classify_mdev(stats.mdev_ms)
                ));
            }
            None => {
                narrative.push_str("RTT statistics: unavailable (no successful samples)\n");
            }
        }

        narrative.push_str(&format!("network score: {} / 100\n", total));

        PingReport {
            host: host.to_string(),
            preset_label: preset_label.to_string(),
            packet_loss_pct: loss,
            stats,
            successful_pings: parsed.successful_pings,
            failed_pings: parsed.failed_pings,
            score: total,
            narrative,
        }
    }
}

/// Parse raw ping text line by line
fn parse_ping_output(text: &str) -> ParsedPing {
    let mut parsed = ParsedPing::default();

    for line in text.lines() {
        if line.contains("bytes from") {
            parsed.successful_pings += 1;
        } else if line.contains("Request timeout") {
            parsed.failed_pings += 1;
        }

        if let Some(rtt) = extract_rtt_ms(line) {
            parsed.rtt_samples.push(rtt);
        }

        if line.contains("packets transmitted") {
            parsed.packet_loss_pct = extract_packet_loss(line);
        }

        if line.contains("rtt min/avg/max/mdev") {
            parsed.rtt_line = extract_rtt_moments(line);
        }
    }

    parsed
}

/// Extract an RTT value from a `time=6.47 ms` marker. Accepts a comma
/// as the decimal separator, which some ping builds emit.
pub(crate) fn extract_rtt_ms(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    let rest = &line[idx + 5..];
    let token = rest.split_whitespace().next()?;
    token.replace(',', ".").parse::<f64>().ok()
}

/// Extract packet-loss percentage from the transmit summary line:
/// `4 packets transmitted, 4 received, 0% packet loss, time 3004ms`
fn extract_packet_loss(line: &str) -> Option<u32> {
    let part = line.split(',').find(|p| p.contains("packet loss"))?;
    let pct = part.trim().split('%').next()?.trim();
    pct.parse::<f64>().ok().map(|v| v.round() as u32)
}

/// Extract the four RTT moments from the statistics line:
/// `rtt min/avg/max/mdev = 5.978/6.212/6.470/0.173 ms`
fn extract_rtt_moments(line: &str) -> Option<(f64, f64, f64, f64)> {
    let values = line.split(" = ").nth(1)?;
    let mut parts = values.split('/');
    let min = parts.next()?.trim().parse().ok()?;
    let avg = parts.next()?.trim().parse().ok()?;
    let max = parts.next()?.trim().parse().ok()?;
    let mdev_token = parts.next()?.trim();
    let mdev = mdev_token
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some((min, avg, max, mdev))
}

/// Packet-loss component, 10 points. Floored at 5 inside the light-
/// loss band so the component never drops below the moderate-loss
/// plateau, keeping it non-increasing in loss.
pub fn packet_loss_score(loss_pct: u32) -> i32 {
    match loss_pct {
        0 => 10,
        1..=10 => (10 - loss_pct as i32).max(5),
        11..=30 => 5,
        _ => 0,
    }
}

/// Average-RTT component, 15 points
pub fn avg_rtt_score(avg_ms: f64) -> i32 {
    if avg_ms < 50.0 {
        15
    } else if avg_ms <= 100.0 {
        10 + (100.0 - avg_ms) as i32 / 10
    } else if avg_ms <= 200.0 {
        5 + (200.0 - avg_ms) as i32 / 20
    } else {
        0
    }
}

/// RTT-jitter component, 15 points
pub fn mdev_score(mdev_ms: f64) -> i32 {
    if mdev_ms < 10.0 {
        15
    } else if mdev_ms <= 30.0 {
        10 + (30.0 - mdev_ms) as i32 / 2
    } else {
        0
    }
}

fn classify_loss(loss_pct: u32) -> &'static str {
    match loss_pct {
        0 => "no loss",
        1..=10 => "light loss",
        11..=30 => "moderate loss",
        _ => "heavy loss",
    }
}

fn classify_avg_rtt(avg_ms: f64) -> &'static str {
    if avg_ms < 50.0 {
        "excellent latency"
    } else if avg_ms <= 100.0 {
        "good latency"
    } else if avg_ms <= 200.0 {
        "fair latency"
    } else {
        "poor latency"
    }
}

fn classify_mdev(mdev_ms: f64) -> &'static str {
    if mdev_ms < 10.0 {
        "stable"
    } else if mdev_ms <= 30.0 {
        "moderate jitter"
    } else {
        "unstable"
    }
}
