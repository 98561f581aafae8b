//! Listener contract between the engine and the host UI.
//!
//! Progress and scores flow through a single tagged event type delivered
//! over one ordered channel. Components only send; nothing is ever read
//! back from the receiver side.

use crate::types::ProbeKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Every observable event a diagnostic run can emit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    /// Device/preamble narrative line (no score)
    DeviceInfo(String),
    /// Domain access / DNS resolution narrative line (no score)
    DomainAccess(String),
    /// Incremental ping analysis text, tagged with the probed address
    /// when one applies
    PingUpdate {
        address: Option<String>,
        text: String,
    },
    /// Incremental TCP connect test text
    TcpUpdate {
        address: Option<String>,
        text: String,
    },
    /// Incremental traceroute text
    TraceUpdate {
        address: Option<String>,
        text: String,
    },
    /// Final 0-100 score for one probe family
    Score { kind: ProbeKind, value: u8 },
    /// One probe family finished (emitted even when every probe failed)
    Completed(ProbeKind),
    /// Fatal run failure; nothing further follows for this run
    Failed(String),
}

impl DiagnosticEvent {
    /// Narrative text carried by this event, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            DiagnosticEvent::DeviceInfo(text)
            | DiagnosticEvent::DomainAccess(text)
            | DiagnosticEvent::PingUpdate { text, .. }
            | DiagnosticEvent::TcpUpdate { text, .. }
            | DiagnosticEvent::TraceUpdate { text, .. }
            | DiagnosticEvent::Failed(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Sending half of the listener contract.
///
/// Cloned freely into concurrently running probe tasks; the channel
/// preserves per-sender ordering. A closed receiver never fails a run,
/// probes keep executing and their results are simply dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<DiagnosticEvent>,
}

impl EventSender {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DiagnosticEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: DiagnosticEvent) {
        // Receiver gone means the host UI went away; not an engine error.
        let _ = self.tx.send(event);
    }

    pub fn device_info<S: Into<String>>(&self, text: S) {
        self.send(DiagnosticEvent::DeviceInfo(text.into()));
    }

    pub fn domain_access<S: Into<String>>(&self, text: S) {
        self.send(DiagnosticEvent::DomainAccess(text.into()));
    }

    pub fn ping_update<S: Into<String>>(&self, address: Option<String>, text: S) {
        self.send(DiagnosticEvent::PingUpdate {
            address,
            text: text.into(),
        });
    }

    pub fn tcp_update<S: Into<String>>(&self, address: Option<String>, text: S) {
        self.send(DiagnosticEvent::TcpUpdate {
            address,
            text: text.into(),
        });
    }

    pub fn trace_update<S: Into<String>>(&self, address: Option<String>, text: S) {
        self.send(DiagnosticEvent::TraceUpdate {
            address,
            text: text.into(),
        });
    }

    pub fn score(&self, kind: ProbeKind, value: u8) {
        self.send(DiagnosticEvent::Score { kind, value });
    }

    pub fn completed(&self, kind: ProbeKind) {
        self.send(DiagnosticEvent::Completed(kind));
    }

    pub fn failed<S: Into<String>>(&self, error: S) {
        self.send(DiagnosticEvent::Failed(error.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_preserve_order() {
        let (sender, mut rx) = EventSender::channel();
        sender.device_info("a");
        sender.domain_access("b");
        sender.score(ProbeKind::Ping, 88);
        sender.completed(ProbeKind::Ping);

        assert_eq!(rx.recv().await, Some(DiagnosticEvent::DeviceInfo("a".into())));
        assert_eq!(rx.recv().await, Some(DiagnosticEvent::DomainAccess("b".into())));
        assert_eq!(
            rx.recv().await,
            Some(DiagnosticEvent::Score {
                kind: ProbeKind::Ping,
                value: 88
            })
        );
        assert_eq!(rx.recv().await, Some(DiagnosticEvent::Completed(ProbeKind::Ping)));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_silent() {
        let (sender, rx) = EventSender::channel();
        drop(rx);
        // Must not panic or error
        sender.tcp_update(Some("1.2.3.4".into()), "late update");
        sender.completed(ProbeKind::Tcp);
    }

    #[test]
    fn test_event_text_accessor() {
        let event = DiagnosticEvent::TraceUpdate {
            address: None,
            text: "hop 1".into(),
        };
        assert_eq!(event.text(), Some("hop 1"));
        assert_eq!(
            DiagnosticEvent::Completed(ProbeKind::Trace).text(),
            None
        );
    }
}
