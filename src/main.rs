//! Network Health Diagnostic - CLI entry point

use clap::Parser;
use colored::Colorize;
use network_health_diag::{
    cli::Cli,
    config::DiagConfig,
    error::{AppError, Result},
    event::{DiagnosticEvent, EventSender},
    logging::Logger,
    orchestrator::DiagnosticOrchestrator,
    types::ProbeKind,
    PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let use_color = cli.use_colors();
    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    // Optional .env file, silently skipped when absent
    let _ = dotenv::dotenv();

    let mut config = DiagConfig::default();
    config.merge_from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    if config.debug {
        println!("{} v{}", PKG_NAME, VERSION);
        println!("Target domain: {}", config.target_domain);
        println!("Ping count: {}", config.ping_count);
        println!("Hop limit: {}", config.hop_limit);
        println!("Execution: {}", if config.sequential { "sequential" } else { "concurrent" });
        println!();
    }

    let logger = Logger::with_config("netdiag".to_string(), &config);
    let use_color = config.enable_color;
    let json_output = cli.json;

    let (events, mut rx) = EventSender::channel();
    let orchestrator = DiagnosticOrchestrator::new(config, events);

    // Render events live while the run progresses. The channel closes
    // once the orchestrator is dropped.
    let renderer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !json_output {
                render_event(&event, use_color);
            }
        }
    });

    let run_result = orchestrator.run().await;
    drop(orchestrator);
    let _ = renderer.await;

    let summary = match run_result {
        Ok(summary) => summary,
        Err(e) => {
            logger.log_app_error(&e, "diagnostic run failed");
            return Err(e);
        }
    };

    if let Some(score) = summary.ping_score {
        logger.log_family_score(ProbeKind::Ping, score);
    }
    if let Some(score) = summary.tcp_score {
        logger.log_family_score(ProbeKind::Tcp, score);
    }
    if let Some(score) = summary.trace_score {
        logger.log_family_score(ProbeKind::Trace, score);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_score_summary(&summary.domain, summary.ping_score, summary.tcp_score, summary.trace_score, use_color);
    }

    Ok(())
}

fn render_event(event: &DiagnosticEvent, use_color: bool) {
    match event {
        DiagnosticEvent::DeviceInfo(text) | DiagnosticEvent::DomainAccess(text) => {
            println!("{}", text);
        }
        DiagnosticEvent::PingUpdate { text, .. }
        | DiagnosticEvent::TcpUpdate { text, .. }
        | DiagnosticEvent::TraceUpdate { text, .. } => {
            println!("{}", text);
        }
        DiagnosticEvent::Score { kind, value } => {
            let line = format!("{} score: {} / 100", kind, value);
            if use_color {
                println!("{}", colorize_score(&line, *value));
            } else {
                println!("{}", line);
            }
        }
        DiagnosticEvent::Completed(kind) => {
            println!("{} diagnostics complete", kind);
        }
        DiagnosticEvent::Failed(error) => {
            if use_color {
                eprintln!("{}", format!("diagnostic failed: {}", error).red().bold());
            } else {
                eprintln!("diagnostic failed: {}", error);
            }
        }
    }
}

fn colorize_score(line: &str, value: u8) -> String {
    if value >= 80 {
        line.green().to_string()
    } else if value >= 50 {
        line.yellow().to_string()
    } else {
        line.red().to_string()
    }
}

fn print_score_summary(
    domain: &str,
    ping: Option<u8>,
    tcp: Option<u8>,
    trace: Option<u8>,
    use_color: bool,
) {
    println!();
    println!("{}", "=".repeat(48));
    println!("Diagnostic summary for {}", domain);
    for (label, score) in [("ping", ping), ("tcp", tcp), ("traceroute", trace)] {
        match score {
            Some(value) => {
                let line = format!("  {:<11} {:>3} / 100", label, value);
                if use_color {
                    println!("{}", colorize_score(&line, value));
                } else {
                    println!("{}", line);
                }
            }
            None => println!("  {:<11} not measured", label),
        }
    }
    println!("{}", "=".repeat(48));
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Echo count must be between 1 and 64");
            eprintln!("  - Hop limit must be between 1 and 30");
        }
        AppError::Resolution(_) => {
            eprintln!();
            eprintln!("DNS resolution help:");
            eprintln!("  - Check if the domain exists");
            eprintln!("  - Test DNS resolution manually with 'nslookup' or 'dig'");
            eprintln!("  - Check your internet connection");
        }
        AppError::ProbeTimeout(_) => {
            eprintln!();
            eprintln!("Timeout troubleshooting:");
            eprintln!("  - Increase the probe timeout with --timeout");
            eprintln!("  - Reduce echo count with --count");
        }
        AppError::Spawn(_) => {
            eprintln!();
            eprintln!("Process troubleshooting:");
            eprintln!("  - Verify the system ping utility is installed and on PATH");
        }
        _ => {}
    }
}
