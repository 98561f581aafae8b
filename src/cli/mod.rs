//! Command-line interface for the diagnostic engine

use crate::config::DiagConfig;
use clap::Parser;

/// Network Health Diagnostic - resolves a target, probes it over ping,
/// TCP connect and traceroute, and reports 0-100 health scores
#[derive(Parser, Debug, Clone)]
#[command(name = "netdiag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target domain to diagnose
    #[arg(short = 'd', long, env = "NETDIAG_TARGET")]
    pub target: Option<String>,

    /// Echo count per ping invocation
    #[arg(short, long)]
    pub count: Option<u32>,

    /// General probe timeout in milliseconds
    #[arg(short, long, value_parser = parse_timeout_ms)]
    pub timeout: Option<u64>,

    /// Traceroute hop upper bound
    #[arg(long)]
    pub hop_limit: Option<u32>,

    /// Run the probe families one after another instead of concurrently
    #[arg(long)]
    pub sequential: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Local interface address reported by the host
    #[arg(long)]
    pub local_ip: Option<String>,

    /// Gateway address reported by the host (used on Wi-Fi only)
    #[arg(long)]
    pub gateway: Option<String>,

    /// Network-type label (wifi, cellular, ...)
    #[arg(long, default_value = "wifi")]
    pub network_type: String,

    /// Carrier/country label, shown in the narrative only
    #[arg(long)]
    pub carrier: Option<String>,

    /// Print the final run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(count) = self.count {
            if count == 0 || count > 64 {
                return Err("Echo count must be between 1 and 64".to_string());
            }
        }

        if let Some(hop_limit) = self.hop_limit {
            if hop_limit == 0 || hop_limit > 30 {
                return Err("Hop limit must be between 1 and 30".to_string());
            }
        }

        if let Some(local_ip) = &self.local_ip {
            if local_ip.parse::<std::net::IpAddr>().is_err() {
                return Err(format!("Invalid local IP address: {}", local_ip));
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Build the engine configuration from defaults overridden by the
    /// command line.
    pub fn to_config(&self) -> DiagConfig {
        let mut config = DiagConfig::default();
        self.apply(&mut config);
        config
    }

    /// Overlay command-line options onto an existing configuration.
    /// Only options the user actually passed are applied.
    pub fn apply(&self, config: &mut DiagConfig) {
        if let Some(target) = &self.target {
            config.target_domain = target.clone();
        }
        if let Some(count) = self.count {
            config.ping_count = count;
        }
        if let Some(timeout_ms) = self.timeout {
            config.probe_timeout_ms = timeout_ms;
        }
        if let Some(hop_limit) = self.hop_limit {
            config.hop_limit = hop_limit;
        }
        config.sequential = self.sequential;
        config.enable_color = self.use_colors();
        config.verbose = self.verbose;
        config.debug = self.debug;
        config.local_ip = self.local_ip.clone();
        config.gateway = self.gateway.clone();
        config.network_type = self.network_type.clone();
        config.carrier = self.carrier.clone();
    }
}

/// Parse a millisecond timeout, rejecting zero and absurd values
fn parse_timeout_ms(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|ms| {
            if ms == 0 {
                Err("Timeout must be greater than 0".to_string())
            } else if ms > 300_000 {
                Err("Timeout cannot exceed 300000 milliseconds".to_string())
            } else {
                Ok(ms)
            }
        })
}

/// Detect whether the terminal supports colored output
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("netdiag").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_invocation_is_valid() {
        let cli = cli_from(&[]);
        assert!(cli.validate().is_ok());
        assert!(cli.target.is_none());
        assert!(!cli.sequential);
    }

    #[test]
    fn test_conflicting_color_flags() {
        let cli = cli_from(&["--color", "--no-color"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_count_bounds() {
        assert!(cli_from(&["--count", "4"]).validate().is_ok());
        assert!(cli_from(&["--count", "0"]).validate().is_err());
        assert!(cli_from(&["--count", "65"]).validate().is_err());
    }

    #[test]
    fn test_hop_limit_bounds() {
        assert!(cli_from(&["--hop-limit", "15"]).validate().is_ok());
        assert!(cli_from(&["--hop-limit", "31"]).validate().is_err());
    }

    #[test]
    fn test_invalid_local_ip_rejected() {
        let cli = cli_from(&["--local-ip", "not-an-ip"]);
        assert!(cli.validate().is_err());
        assert!(cli_from(&["--local-ip", "192.168.1.5"]).validate().is_ok());
    }

    #[test]
    fn test_timeout_parser() {
        assert_eq!(parse_timeout_ms("1000"), Ok(1000));
        assert!(parse_timeout_ms("0").is_err());
        assert!(parse_timeout_ms("+5").is_err());
        assert!(parse_timeout_ms("400000").is_err());
        assert!(parse_timeout_ms("abc").is_err());
    }

    #[test]
    fn test_to_config_overrides() {
        let cli = cli_from(&[
            "--target",
            "example.org",
            "--count",
            "8",
            "--hop-limit",
            "10",
            "--sequential",
            "--network-type",
            "wifi",
            "--gateway",
            "192.168.1.1",
        ]);
        let config = cli.to_config();
        assert_eq!(config.target_domain, "example.org");
        assert_eq!(config.ping_count, 8);
        assert_eq!(config.hop_limit, 10);
        assert!(config.sequential);
        assert!(config.network_type().is_wifi());
        assert_eq!(config.gateway.as_deref(), Some("192.168.1.1"));
    }
}
