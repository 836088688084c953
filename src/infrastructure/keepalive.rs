use crate::types::OutboundFrame;
use crate::types::constants::KEEPALIVE_INTERVAL;
use chrono::{SecondsFormat, Utc};
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(KEEPALIVE_INTERVAL);
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// What the hub should do on a keepalive tick
#[derive(Debug, Clone, PartialEq)]
pub enum KeepaliveAction {
    /// Send this liveness frame
    SendPing(OutboundFrame),
    /// Previous ping went unanswered and reply enforcement is on
    Expired,
}

/// Emits `ping` frames on a fixed interval while the transport is open.
///
/// A monitor lives exactly as long as one open connection; dropping it
/// releases the interval timer. Reply enforcement is opt-in: by default
/// liveness is left to the transport's own close event.
pub struct KeepaliveMonitor {
    interval: Interval,
    enforce_reply: bool,
    pending_since: Option<Instant>,
}

impl KeepaliveMonitor {
    /// First tick fires one full `period` after start. A zero period is
    /// raised to 1ms, tokio intervals cannot be empty.
    pub fn start(period: Duration, enforce_reply: bool) -> Self {
        let period = period.max(MIN_PERIOD);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            enforce_reply,
            pending_since: None,
        }
    }

    /// Waits for the next tick. Cancel safe.
    pub async fn tick(&mut self) -> KeepaliveAction {
        self.interval.tick().await;

        if self.enforce_reply && let Some(sent) = self.pending_since {
            tracing::warn!(
                "Keepalive reply missing for {:?}, treating connection as dead",
                sent.elapsed()
            );
            return KeepaliveAction::Expired;
        }

        self.pending_since = Some(Instant::now());
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        KeepaliveAction::SendPing(OutboundFrame::ping(timestamp))
    }

    /// Any inbound frame proves the peer is alive
    pub fn record_inbound(&mut self) {
        self.pending_since = None;
    }

    pub fn awaiting_reply(&self) -> bool {
        self.pending_since.is_some()
    }
}

impl Default for KeepaliveMonitor {
    fn default() -> Self {
        Self::start(DEFAULT_KEEPALIVE_INTERVAL, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_ping_after_one_interval() {
        let started = Instant::now();
        let mut monitor = KeepaliveMonitor::start(Duration::from_secs(30), false);

        let action = monitor.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        let KeepaliveAction::SendPing(frame) = action else {
            panic!("expected ping");
        };
        assert_eq!(frame.kind, "ping");
        assert!(frame.data["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(monitor.awaiting_reply());
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_enforcement_keeps_pinging() {
        let mut monitor = KeepaliveMonitor::start(Duration::from_secs(1), false);
        for _ in 0..3 {
            assert!(matches!(monitor.tick().await, KeepaliveAction::SendPing(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforced_reply_expires() {
        let mut monitor = KeepaliveMonitor::start(Duration::from_secs(1), true);

        assert!(matches!(monitor.tick().await, KeepaliveAction::SendPing(_)));
        monitor.record_inbound();
        assert!(!monitor.awaiting_reply());

        assert!(matches!(monitor.tick().await, KeepaliveAction::SendPing(_)));
        assert_eq!(monitor.tick().await, KeepaliveAction::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_does_not_panic() {
        let started = Instant::now();
        let mut monitor = KeepaliveMonitor::start(Duration::ZERO, false);

        assert!(matches!(monitor.tick().await, KeepaliveAction::SendPing(_)));
        assert_eq!(started.elapsed(), Duration::from_millis(1));
    }
}
