//! Heartbeat monitor — per-peer liveness over the active connection.
//!
//! Built once per peer by the context's heartbeat factory and
//! installed as one of the two bootstrap handlers on every
//! connection. Sends a liveness frame every interval and invokes the
//! termination handler if no inbound frame arrives within the timeout
//! window. Heartbeat state is connection-scoped: each new connection
//! starts a fresh window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::handler::{BootstrapHandler, TerminateReason, TerminationHandler};
use crate::transport::{Conn, Frame};

/// Liveness monitor for one peer.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
}

impl HeartbeatMonitor {
    /// Create a monitor sending every `interval_ms` and expiring after
    /// `timeout_ms` without an inbound frame.
    ///
    /// The interval is clamped to at least 1ms: the ticker panics on a
    /// zero period, and inside a detached task that panic would kill
    /// liveness monitoring silently.
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms.max(1)),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl BootstrapHandler for HeartbeatMonitor {
    async fn on_connect(&self, conn: Arc<dyn Conn>, termination: Arc<dyn TerminationHandler>) {
        let interval = self.interval;
        let timeout = self.timeout;
        tokio::spawn(async move {
            run_heartbeat_loop(conn, interval, timeout, termination).await;
        });
    }
}

/// Connection-scoped heartbeat task. Ends when the connection closes
/// or the timeout expires.
async fn run_heartbeat_loop(
    conn: Arc<dyn Conn>,
    interval: Duration,
    timeout: Duration,
    termination: Arc<dyn TerminationHandler>,
) {
    let peer = conn.peer();
    let mut inbound = conn.subscribe();
    let mut closed = conn.closed();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the window opens now.
    let mut deadline = Instant::now() + timeout;

    loop {
        tokio::select! {
            // A close must win over a tick so we never send on a
            // connection that ended under us.
            biased;
            _ = closed.changed() => {
                // The connection ended elsewhere; its termination path
                // is driven by whoever closed it.
                debug!(peer, "connection closed — heartbeat task stopping");
                return;
            }
            frame = inbound.recv() => {
                match frame {
                    // Any inbound traffic proves the peer alive.
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        deadline = Instant::now() + timeout;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(peer, "inbound stream ended — heartbeat task stopping");
                        return;
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!(peer, timeout_ms = timeout.as_millis() as u64, "heartbeat timeout");
                conn.close().await;
                termination.on_terminate(TerminateReason::HeartbeatTimeout).await;
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = conn.send(Frame::Heartbeat).await {
                    warn!(peer, error = %e, "heartbeat send failed");
                    conn.close().await;
                    termination.on_terminate(TerminateReason::IoError).await;
                    return;
                }
                debug!(peer, "heartbeat sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryConn, RecordingTermination};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn sends_heartbeats_every_interval() {
        let conn = MemoryConn::new(2);
        let termination = Arc::new(RecordingTermination::default());
        let monitor = HeartbeatMonitor::new(100, 1000);
        assert_eq!(monitor.interval(), Duration::from_millis(100));
        assert_eq!(monitor.timeout(), Duration::from_millis(1000));

        monitor
            .on_connect(conn.clone(), termination.clone())
            .await;

        // Keep the peer alive while three intervals elapse.
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            conn.inject_inbound(Frame::Heartbeat);
        }
        tokio::task::yield_now().await;

        // First tick is immediate, then one per interval.
        assert!(conn.sent().len() >= 3);
        assert!(conn.sent().iter().all(|f| *f == Frame::Heartbeat));
        assert_eq!(termination.reasons(), vec![]);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_triggers_termination_with_timeout_reason() {
        let conn = MemoryConn::new(2);
        let termination = Arc::new(RecordingTermination::default());
        let monitor = HeartbeatMonitor::new(100, 250);

        monitor
            .on_connect(conn.clone(), termination.clone())
            .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;

        assert_eq!(termination.reasons(), vec![TerminateReason::HeartbeatTimeout]);
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_frames_reset_the_window() {
        let conn = MemoryConn::new(2);
        let termination = Arc::new(RecordingTermination::default());
        let monitor = HeartbeatMonitor::new(100, 250);

        monitor
            .on_connect(conn.clone(), termination.clone())
            .await;

        // Feed a frame every 200ms: inside the 250ms window each time.
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            conn.inject_inbound(Frame::App(vec![1]));
        }
        tokio::task::yield_now().await;

        assert_eq!(termination.reasons(), vec![]);

        // Then go silent past the window.
        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;
        assert_eq!(termination.reasons(), vec![TerminateReason::HeartbeatTimeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_monitors_liveness() {
        let conn = MemoryConn::new(2);
        let termination = Arc::new(RecordingTermination::default());
        // A zero interval must not kill the monitor task.
        let monitor = HeartbeatMonitor::new(0, 250);
        assert_eq!(monitor.interval(), Duration::from_millis(1));

        monitor
            .on_connect(conn.clone(), termination.clone())
            .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;

        assert_eq!(termination.reasons(), vec![TerminateReason::HeartbeatTimeout]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_quietly_when_connection_closes() {
        let conn = MemoryConn::new(2);
        let termination = Arc::new(RecordingTermination::default());
        let monitor = HeartbeatMonitor::new(100, 1000);

        monitor
            .on_connect(conn.clone(), termination.clone())
            .await;

        conn.close().await;
        tokio::time::sleep(Duration::from_millis(2000)).await;
        tokio::task::yield_now().await;

        // Closing elsewhere does not run the termination path here.
        assert_eq!(termination.reasons(), vec![]);
    }
}
