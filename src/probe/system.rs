//! ProbeRunner implementation that shells out to the OS ping binary

use crate::probe::ProbeRunner;
use crate::types::ProbeOutput;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;

/// Fixed payload size used when a sized probe is requested
const SIZED_PACKET_BYTES: u32 = 8185;

/// Runs the system `ping` utility with a hard wall-clock timeout.
///
/// The spawned process is terminated on every exit path: normal
/// completion reaps it, and `kill_on_drop` kills it when the timed-out
/// wait future is dropped, so repeated invocation cannot leak processes
/// or file descriptors.
#[derive(Debug, Clone)]
pub struct SystemPingRunner {
    program: String,
}

impl Default for SystemPingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPingRunner {
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }

    /// Point the runner at a different executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_command(&self, host: &str, count: u32, ttl: Option<u32>, sized: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        if sized {
            cmd.arg("-s").arg(SIZED_PACKET_BYTES.to_string());
        }
        if let Some(ttl) = ttl {
            cmd.arg("-t").arg(ttl.to_string());
        }
        cmd.arg("-c").arg(count.to_string()).arg(host);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProbeRunner for SystemPingRunner {
    async fn run(
        &self,
        host: &str,
        count: u32,
        ttl: Option<u32>,
        sized: bool,
        timeout: Duration,
    ) -> ProbeOutput {
        let mut cmd = self.build_command(host, count, ttl, sized);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ProbeOutput::Error(format!("failed to spawn ping: {}", e)),
        };

        match time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                ProbeOutput::Text(text)
            }
            Ok(Err(e)) => ProbeOutput::Error(format!("ping wait failed: {}", e)),
            // Dropping the wait future drops the child, which is killed
            // via kill_on_drop.
            Err(_) => ProbeOutput::Timeout {
                host: host.to_string(),
            },
        }
    }
}
