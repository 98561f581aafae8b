//! Concurrent TCP connect probing with RTT measurement and scoring

use crate::config::DiagConfig;
use crate::event::EventSender;
use crate::models::{Address, TcpAddressReport, TcpReport};
use crate::stats::AttemptCounts;
use crate::types::{clamp_score, ProbeKind, RttSample};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time;

const HOST_UNREACHABLE: &str = "DNS resolved but returned no addresses, host unreachable";
const TIMEOUT_TEXT: &str = "connect timed out, TCP establishment failed";
const IO_ERR_TEXT: &str = "I/O error, TCP establishment failed";

/// Measures TCP reachability by opening short-lived connections to each
/// resolved address. All addresses are probed concurrently; each
/// concurrent task owns its own attempt buffer end-to-end, so no state
/// is shared between addresses.
pub struct TcpConnectProbe {
    conn_times: u32,
    port: u16,
    timeout: Duration,
    timeout_increment: Duration,
    events: EventSender,
}

impl TcpConnectProbe {
    pub fn new(config: &DiagConfig, events: EventSender) -> Self {
        Self {
            conn_times: config.conn_times,
            port: config.tcp_port,
            timeout: config.tcp_timeout(),
            timeout_increment: Duration::from_millis(config.tcp_timeout_increment_ms),
            events,
        }
    }

    /// Probe every address and emit the aggregate score. Always ends
    /// with a completion event, even when every attempt failed.
    pub async fn probe(&self, addresses: &[Address]) -> TcpReport {
        if addresses.is_empty() {
            self.events.tcp_update(None, HOST_UNREACHABLE);
            self.events.score(ProbeKind::Tcp, 0);
            self.events.completed(ProbeKind::Tcp);
            return TcpReport {
                per_address: Vec::new(),
                score: 0,
                narrative: HOST_UNREACHABLE.to_string(),
            };
        }

        let mut tasks = JoinSet::new();
        for address in addresses {
            let addr = SocketAddr::new(address.ip, self.port);
            let display = address.display.clone();
            let conn_times = self.conn_times;
            let timeout = self.timeout;
            let increment = self.timeout_increment;
            tasks.spawn(async move {
                probe_single_address(addr, display, conn_times, timeout, increment).await
            });
        }

        // Wait for every per-address task regardless of its outcome.
        let mut per_address = Vec::with_capacity(addresses.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    self.events
                        .tcp_update(Some(report.address.clone()), report.narrative.clone());
                    per_address.push(report);
                }
                Err(e) => {
                    self.events
                        .tcp_update(None, format!("connection task aborted: {}", e));
                }
            }
        }

        let report = aggregate_report(per_address);
        self.events.tcp_update(None, report.narrative.clone());
        self.events.score(ProbeKind::Tcp, report.score);
        self.events.completed(ProbeKind::Tcp);
        report
    }
}

/// Sequential connect attempts against one address. The attempt buffer
/// lives in this task only and is merged into the aggregate afterwards.
async fn probe_single_address(
    addr: SocketAddr,
    display: String,
    conn_times: u32,
    base_timeout: Duration,
    increment: Duration,
) -> TcpAddressReport {
    let mut samples: Vec<RttSample> = Vec::with_capacity(conn_times as usize);
    let mut budget = base_timeout;
    let mut log = format!("connecting to host {}...\n", display);

    for attempt in 0..conn_times {
        let sample = connect_once(addr, budget).await;
        samples.push(sample);

        match sample {
            RttSample::Ok(rtt) => {
                log.push_str(&format!("attempt {}: {:.0} ms\n", attempt + 1, rtt));
            }
            RttSample::Timeout => {
                log.push_str(&format!("attempt {}: {}\n", attempt + 1, TIMEOUT_TEXT));
                // Back off on a flaky link rather than thrashing.
                budget += increment;
            }
            RttSample::IoError => {
                log.push_str(&format!("attempt {}: {}\n", attempt + 1, IO_ERR_TEXT));
            }
        }

        // Two identical failures in a row: further attempts are futile.
        if attempt >= 1 {
            let prev = samples[attempt as usize - 1];
            let repeated_failure = (sample.is_timeout() && prev.is_timeout())
                || (sample.is_io_error() && prev.is_io_error());
            if repeated_failure {
                log.push_str("repeated failure, aborting remaining attempts\n");
                break;
            }
        }
    }

    let counts = AttemptCounts::from_samples(&samples);
    let successful: Vec<f64> = samples.iter().filter_map(|s| s.rtt_ms()).collect();
    let avg_rtt_ms = if successful.is_empty() {
        None
    } else {
        Some(successful.iter().sum::<f64>() / successful.len() as f64)
    };

    match avg_rtt_ms {
        Some(avg) => log.push_str(&format!("average RTT: {:.0} ms\nconnection established\n", avg)),
        None => log.push_str("connection failed\n"),
    }

    log.push_str(&address_mini_report(&display, &counts, avg_rtt_ms));

    TcpAddressReport {
        address: display,
        samples,
        counts,
        avg_rtt_ms,
        narrative: log,
    }
}

/// One connect attempt. The stream is dropped (and the socket closed)
/// on every path out of this function.
async fn connect_once(addr: SocketAddr, budget: Duration) -> RttSample {
    let start = Instant::now();
    match time::timeout(budget, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => RttSample::Ok(start.elapsed().as_secs_f64() * 1000.0),
        Ok(Err(_)) => RttSample::IoError,
        Err(_) => RttSample::Timeout,
    }
}

/// Per-address analysis block appended after the attempt lines
fn address_mini_report(display: &str, counts: &AttemptCounts, avg_rtt_ms: Option<f64>) -> String {
    let mut report = format!("\nTCP connect report ({}):\n", display);
    report.push_str(&format!(
        "successful connects: {}/{}\n",
        counts.success,
        counts.total()
    ));
    report.push_str(&format!(
        "timeouts: {}/{}, I/O errors: {}/{}\n",
        counts.timeout,
        counts.total(),
        counts.io_error,
        counts.total()
    ));
    match avg_rtt_ms {
        Some(avg) => report.push_str(&format!("average connect time: {:.0} ms\n", avg)),
        None => report.push_str("no successful connect, average time unavailable\n"),
    }

    if counts.failures() == 0 && counts.success > 0 {
        report.push_str("connection state: excellent\n");
    } else if counts.success > 0 {
        report.push_str("connection state: mixed, some timeouts or errors\n");
    } else {
        report.push_str("connection state: poor, all attempts failed\n");
    }
    report
}

/// Merge per-address results and score the whole batch
fn aggregate_report(per_address: Vec<TcpAddressReport>) -> TcpReport {
    let mut batch = AttemptCounts::default();
    let mut rtts: Vec<f64> = Vec::new();
    for report in &per_address {
        batch.success += report.counts.success;
        batch.timeout += report.counts.timeout;
        batch.io_error += report.counts.io_error;
        rtts.extend(report.samples.iter().filter_map(|s| s.rtt_ms()));
    }

    let avg_rtt = if rtts.is_empty() {
        None
    } else {
        Some(rtts.iter().sum::<f64>() / rtts.len() as f64)
    };

    let score = connection_score(&batch, avg_rtt);

    let mut narrative = String::from("\nTCP connection summary:\n");
    narrative.push_str(&format!(
        "attempts: {} total, {} ok, {} timeout, {} I/O error\n",
        batch.total(),
        batch.success,
        batch.timeout,
        batch.io_error
    ));
    match avg_rtt {
        Some(avg) => narrative.push_str(&format!("average RTT over successes: {:.0} ms\n", avg)),
        None => narrative.push_str("no successful connection, RTT unavailable\n"),
    }
    narrative.push_str(&format!("connection score: {} / 100\n", score));

    TcpReport {
        per_address,
        score,
        narrative,
    }
}

/// Batch score: success ratio (60) + RTT band (20) + stability (20).
/// Forced to 0 when nothing connected anywhere.
pub fn connection_score(counts: &AttemptCounts, avg_rtt_ms: Option<f64>) -> u8 {
    if counts.success == 0 || counts.total() == 0 {
        return 0;
    }

    let ratio_component = (counts.success as f64 / counts.total() as f64 * 60.0) as i32;

    let rtt_component = match avg_rtt_ms {
        Some(avg) if avg < 100.0 => 20,
        Some(avg) if avg <= 300.0 => 10,
        Some(avg) if avg <= 500.0 => 5,
        Some(_) => 0,
        None => 0,
    };

    let stability_component = if counts.failures() == 0 {
        20
    } else if counts.failures() < counts.total() / 2 {
        10
    } else {
        5
    };

    clamp_score(ratio_component + rtt_component + stability_component)
}
