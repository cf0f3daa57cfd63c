//! Notifier — per-peer event fan-out and termination hub.
//!
//! Bound to one peer's supervisor and connector, holding the two
//! bootstrap handlers to (re)install on every successful connection.
//! It implements both capability traits: [`ConnectionListener`] for
//! state-change fan-out and [`TerminationHandler`] to close the retry
//! loop, so peer failures heal without external intervention.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::handler::{
    BootstrapHandler, ConnectionListener, TerminateReason, TerminationHandler,
};
use crate::peer::PeerId;
use crate::supervisor::{LinkState, Supervisor};
use crate::transport::NetworkStatsListener;

/// Event hub for one peer.
pub struct Notifier {
    supervisor: Arc<Supervisor>,
    connector: Arc<Connector>,
    bootstraps: Vec<Arc<dyn BootstrapHandler>>,
    stats: Option<Arc<dyn NetworkStatsListener>>,
}

impl Notifier {
    pub fn new(
        supervisor: Arc<Supervisor>,
        connector: Arc<Connector>,
        bootstraps: Vec<Arc<dyn BootstrapHandler>>,
        stats: Option<Arc<dyn NetworkStatsListener>>,
    ) -> Self {
        Self {
            supervisor,
            connector,
            bootstraps,
            stats,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.supervisor.peer()
    }

    /// Kick off connecting: hand the connector the bootstrap handlers
    /// and this notifier as both listener and termination handler.
    pub fn connect(self: &Arc<Self>) {
        self.connector.connect(
            self.bootstraps.clone(),
            Arc::clone(self) as Arc<dyn TerminationHandler>,
            Arc::clone(self) as Arc<dyn ConnectionListener>,
        );
    }
}

#[async_trait]
impl TerminationHandler for Notifier {
    /// The active connection ended: mark the supervisor disconnected
    /// (unless the peer is disabled) and schedule exactly one new
    /// attempt per the strategy.
    async fn on_terminate(&self, reason: TerminateReason) {
        let peer = self.peer();
        info!(peer, ?reason, "connection terminated");

        match self.supervisor.state() {
            LinkState::Disabled => {
                debug!(peer, "peer disabled — not reconnecting");
                return;
            }
            LinkState::Connected | LinkState::Connecting => {
                if let Err(e) = self.supervisor.transition(LinkState::Disconnected) {
                    warn!(peer, error = %e, "termination raced a state change");
                    return;
                }
            }
            LinkState::Disconnected => {}
        }

        self.connector.drop_active().await;
        self.on_connection_changed(peer, false);
        self.connector.schedule_reconnect();
    }
}

impl ConnectionListener for Notifier {
    fn on_connection_changed(&self, peer: PeerId, connected: bool) {
        debug!(peer, connected, "connection state changed");
        if let Some(stats) = &self.stats {
            if connected {
                stats.on_connected(peer);
            } else {
                stats.on_disconnected(peer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ConnectionStrategy;
    use crate::testutil::{MemoryTransport, RecordingStats};
    use std::time::Duration;

    fn wired_notifier(
        transport: Arc<MemoryTransport>,
        strategy: ConnectionStrategy,
        stats: Option<Arc<dyn NetworkStatsListener>>,
    ) -> (Arc<Notifier>, Arc<Supervisor>, Arc<Connector>) {
        let supervisor = Arc::new(Supervisor::new(5));
        let connector = Arc::new(Connector::new(
            5,
            transport,
            Arc::clone(&supervisor),
            strategy,
        ));
        let notifier = Arc::new(Notifier::new(
            Arc::clone(&supervisor),
            Arc::clone(&connector),
            vec![],
            stats,
        ));
        (notifier, supervisor, connector)
    }

    #[tokio::test(start_paused = true)]
    async fn termination_schedules_exactly_one_new_attempt() {
        let transport = Arc::new(MemoryTransport::new(0));
        let (notifier, supervisor, _connector) = wired_notifier(
            Arc::clone(&transport),
            ConnectionStrategy::FixedDelay { delay_ms: 1000 },
            None,
        );

        notifier.connect();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(supervisor.state(), LinkState::Connected);
        assert_eq!(transport.attempts(), 1);

        notifier.on_terminate(TerminateReason::PeerClosed).await;
        assert_eq!(supervisor.state(), LinkState::Disconnected);
        assert!(transport.last_conn().unwrap().is_closed());

        tokio::time::sleep(Duration::from_millis(5000)).await;
        // Exactly one reconnect attempt, not zero, not several.
        assert_eq!(transport.attempts(), 2);
        assert_eq!(supervisor.state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn termination_of_disabled_peer_does_not_reconnect() {
        let transport = Arc::new(MemoryTransport::new(0));
        let (notifier, supervisor, connector) = wired_notifier(
            Arc::clone(&transport),
            ConnectionStrategy::Immediate,
            None,
        );

        notifier.connect();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.attempts(), 1);

        supervisor.disable();
        connector.cancel().await;
        notifier.on_terminate(TerminateReason::IoError).await;

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(transport.attempts(), 1);
        assert_eq!(supervisor.state(), LinkState::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_timeout_takes_the_same_path_as_transport_failure() {
        let transport = Arc::new(MemoryTransport::new(0));
        let (notifier, supervisor, _connector) = wired_notifier(
            Arc::clone(&transport),
            ConnectionStrategy::Immediate,
            None,
        );

        notifier.connect();
        tokio::time::sleep(Duration::from_millis(1)).await;

        notifier
            .on_terminate(TerminateReason::HeartbeatTimeout)
            .await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        // Self-healing: a fresh connection exists again.
        assert_eq!(transport.attempts(), 2);
        assert_eq!(supervisor.state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_listener_sees_connect_and_disconnect() {
        let transport = Arc::new(MemoryTransport::new(0));
        let stats = Arc::new(RecordingStats::default());
        let (notifier, _supervisor, _connector) = wired_notifier(
            Arc::clone(&transport),
            ConnectionStrategy::FixedDelay { delay_ms: 60_000 },
            Some(stats.clone() as Arc<dyn NetworkStatsListener>),
        );

        notifier.connect();
        tokio::time::sleep(Duration::from_millis(1)).await;
        notifier.on_terminate(TerminateReason::PeerClosed).await;

        assert_eq!(stats.events(), vec![(5, true), (5, false)]);
    }
}
