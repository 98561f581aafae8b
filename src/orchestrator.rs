//! Top-level run coordination: resolve once, fan out the probe
//! families, relay every event, and always deliver per-family
//! completion signals.

use crate::config::DiagConfig;
use crate::error::{AppError, Result};
use crate::event::EventSender;
use crate::models::{PingReport, RunSummary, Target, TcpReport, TraceReport};
use crate::ping::PingAnalyzer;
use crate::probe::{ProbeRunner, SystemPingRunner};
use crate::tcp::TcpConnectProbe;
use crate::trace::TraceRouter;
use crate::types::{clamp_score, ProbeKind};
use futures::future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio::time;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Runs one full diagnostic against the configured target.
///
/// Constructed per run and owns every component it fans out to. DNS
/// failure is the only error that escapes; probe-level failures are
/// absorbed inside their family and surface as degraded scores.
pub struct DiagnosticOrchestrator {
    config: DiagConfig,
    runner: Arc<dyn ProbeRunner>,
    events: EventSender,
}

impl DiagnosticOrchestrator {
    pub fn new(config: DiagConfig, events: EventSender) -> Self {
        Self {
            config,
            runner: Arc::new(SystemPingRunner::new()),
            events,
        }
    }

    /// Replace the external-command runner, used by tests to substitute
    /// canned probe output.
    pub fn with_runner(config: DiagConfig, runner: Arc<dyn ProbeRunner>, events: EventSender) -> Self {
        Self {
            config,
            runner,
            events,
        }
    }

    /// Execute the full diagnostic. Resolution failure halts the run
    /// with a `Failed` event; anything past resolution always ends with
    /// completion signals for all three probe families.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(self.config.target_domain.clone());

        let preamble = self.device_preamble();
        self.events.device_info(preamble.clone());
        summary.append_log(&preamble);

        let target = match self.resolve_target().await {
            Ok(target) => target,
            Err(e) => {
                self.events.failed(e.to_string());
                return Err(e);
            }
        };

        let access = format!(
            "resolved {} to [{}] in {} ms",
            target.domain,
            target.ip_strings().join(", "),
            target.resolve_duration.as_millis()
        );
        self.events.domain_access(access.clone());
        summary.append_log(&access);

        // Pool-wide guard: past this budget, remaining probes are
        // cancelled by dropping their futures.
        let families = self.run_families(&target);
        let (ping_reports, tcp_report, trace_reports) =
            match time::timeout(self.config.run_timeout(), families).await {
                Ok(results) => results,
                Err(_) => {
                    let e = AppError::probe_timeout(format!(
                        "diagnostic run exceeded {} seconds",
                        self.config.run_timeout_secs
                    ));
                    self.events.failed(e.to_string());
                    return Err(e);
                }
            };

        for report in &ping_reports {
            summary.append_log(&report.narrative);
        }
        for report in &tcp_report.per_address {
            summary.append_log(&report.narrative);
        }
        summary.append_log(&tcp_report.narrative);
        for report in &trace_reports {
            summary.append_log(&report.narrative);
        }

        summary.ping_score = Some(aggregate_ping_score(&ping_reports, &target));
        summary.tcp_score = Some(tcp_report.score);
        summary.trace_score = Some(aggregate_trace_score(&trace_reports));
        Ok(summary)
    }

    /// Narrative preamble describing the device-side collaborator inputs
    fn device_preamble(&self) -> String {
        let mut text = format!("network type: {}", self.config.network_type);
        if let Some(carrier) = &self.config.carrier {
            text.push_str(&format!("\ncarrier: {}", carrier));
        }
        if let Some(local_ip) = &self.config.local_ip {
            text.push_str(&format!("\nlocal address: {}", local_ip));
        }
        if let Some(gateway) = &self.config.gateway {
            if self.config.network_type().is_wifi() {
                text.push_str(&format!("\ngateway: {}", gateway));
            }
        }
        text
    }

    async fn resolve_target(&self) -> Result<Target> {
        // Prefer the system resolver configuration, fall back to the
        // built-in public defaults when none can be read.
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });

        let started = Instant::now();
        let lookup = resolver.lookup_ip(self.config.target_domain.as_str()).await?;
        let elapsed = started.elapsed();

        let ips: Vec<IpAddr> = lookup.iter().collect();
        if ips.is_empty() {
            return Err(AppError::resolution(format!(
                "{} resolved to no addresses",
                self.config.target_domain
            )));
        }
        Ok(Target::new(self.config.target_domain.clone(), ips, elapsed))
    }

    /// Fan out the three probe families, either side by side or in
    /// order. Every family delivers its own score and completion event.
    async fn run_families(&self, target: &Target) -> (Vec<PingReport>, TcpReport, Vec<TraceReport>) {
        if self.config.sequential {
            let ping = self.run_ping_family(target).await;
            let tcp = self.run_tcp_family(target).await;
            let trace = self.run_trace_family(target).await;
            (ping, tcp, trace)
        } else {
            tokio::join!(
                self.run_ping_family(target),
                self.run_tcp_family(target),
                self.run_trace_family(target),
            )
        }
    }

    /// Ping test points: the local stack, the local interface, the
    /// gateway on Wi-Fi, then every resolved target address.
    fn ping_test_points(&self, target: &Target) -> Vec<(String, String)> {
        let mut points = vec![(
            "local network stack".to_string(),
            "127.0.0.1".to_string(),
        )];
        if let Some(local_ip) = &self.config.local_ip {
            points.push(("local interface".to_string(), local_ip.clone()));
        }
        if self.config.network_type().is_wifi() {
            if let Some(gateway) = &self.config.gateway {
                points.push(("gateway".to_string(), gateway.clone()));
            }
        }
        for addr in &target.addresses {
            points.push((format!("target address {}", addr.display), addr.display.clone()));
        }
        points
    }

    async fn run_ping_family(&self, target: &Target) -> Vec<PingReport> {
        let analyzer = PingAnalyzer::new(
            Arc::clone(&self.runner),
            self.config.ping_count,
            self.config.probe_timeout(),
        );

        // All test points probe concurrently; join_all keeps the
        // results in test-point order.
        let points = self.ping_test_points(target);
        let reports = future::join_all(
            points
                .iter()
                .map(|(label, host)| analyzer.analyze(label, host)),
        )
        .await;

        for report in &reports {
            self.events
                .ping_update(Some(report.host.clone()), report.narrative.clone());
        }

        let score = aggregate_ping_score(&reports, target);
        self.events.score(ProbeKind::Ping, score);
        self.events.completed(ProbeKind::Ping);
        reports
    }

    async fn run_tcp_family(&self, target: &Target) -> TcpReport {
        let probe = TcpConnectProbe::new(&self.config, self.events.clone());
        probe.probe(&target.addresses).await
    }

    async fn run_trace_family(&self, target: &Target) -> Vec<TraceReport> {
        let mut tasks = JoinSet::new();
        for addr in &target.addresses {
            let tracer = TraceRouter::new(
                Arc::clone(&self.runner),
                self.config.hop_limit,
                self.config.hop_timeout(),
                self.config.probe_timeout(),
            );
            let events = self.events.clone();
            let display = addr.display.clone();
            tasks.spawn(async move { tracer.trace(&display, &events).await });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(report) = joined {
                reports.push(report);
            }
        }

        let score = aggregate_trace_score(&reports);
        self.events.score(ProbeKind::Trace, score);
        self.events.completed(ProbeKind::Trace);
        reports
    }
}

/// Family score for ping: mean over the resolved target addresses.
/// Local test points inform the narrative but not the score.
fn aggregate_ping_score(reports: &[PingReport], target: &Target) -> u8 {
    let target_ips = target.ip_strings();
    let scores: Vec<u32> = reports
        .iter()
        .filter(|r| target_ips.contains(&r.host))
        .map(|r| r.score as u32)
        .collect();
    if scores.is_empty() {
        return 0;
    }
    clamp_score((scores.iter().sum::<u32>() / scores.len() as u32) as i32)
}

/// Family score for traceroute: mean over per-address path scores
fn aggregate_trace_score(reports: &[TraceReport]) -> u8 {
    if reports.is_empty() {
        return 0;
    }
    let sum: u32 = reports.iter().map(|r| r.score as u32).sum();
    clamp_score((sum / reports.len() as u32) as i32)
}
