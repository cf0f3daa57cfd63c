//! Connector — owns the retry loop for one peer.
//!
//! `connect` runs at most one attempt task per peer. The task drives
//! the supervisor through `Connecting` and either lands in
//! `Connected` (installing both bootstrap handlers on the new
//! connection) or falls back to `Disconnected` and sleeps the delay
//! the strategy returns before trying again. Retries never overlap:
//! the single task is the only place attempts are made.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handler::{BootstrapHandler, ConnectionListener, TerminationHandler};
use crate::peer::PeerId;
use crate::strategy::ConnectionStrategy;
use crate::supervisor::{LinkState, Supervisor};
use crate::transport::{Conn, Transport};

/// Everything an attempt needs besides the transport: the bootstrap
/// handlers to install and the peer's event/termination sinks.
#[derive(Clone)]
struct Wiring {
    bootstraps: Vec<Arc<dyn BootstrapHandler>>,
    termination: Arc<dyn TerminationHandler>,
    listener: Arc<dyn ConnectionListener>,
}

/// Connection-attempt orchestrator for one peer.
pub struct Connector {
    peer: PeerId,
    transport: Arc<dyn Transport>,
    supervisor: Arc<Supervisor>,
    strategy: ConnectionStrategy,
    wiring: Mutex<Option<Wiring>>,
    attempt: Mutex<Option<JoinHandle<()>>>,
    active: Mutex<Option<Arc<dyn Conn>>>,
}

impl Connector {
    pub fn new(
        peer: PeerId,
        transport: Arc<dyn Transport>,
        supervisor: Arc<Supervisor>,
        strategy: ConnectionStrategy,
    ) -> Self {
        Self {
            peer,
            transport,
            supervisor,
            strategy,
            wiring: Mutex::new(None),
            attempt: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// The active connection, if one exists.
    pub fn active(&self) -> Option<Arc<dyn Conn>> {
        self.active.lock().unwrap().clone()
    }

    /// Install the wiring and begin connecting.
    ///
    /// Non-blocking: the attempt itself runs on the runtime.
    pub fn connect(
        self: &Arc<Self>,
        bootstraps: Vec<Arc<dyn BootstrapHandler>>,
        termination: Arc<dyn TerminationHandler>,
        listener: Arc<dyn ConnectionListener>,
    ) {
        *self.wiring.lock().unwrap() = Some(Wiring {
            bootstraps,
            termination,
            listener,
        });
        self.spawn_attempt(Duration::ZERO);
    }

    /// Schedule one new attempt after the strategy's delay.
    ///
    /// Called from the termination path; a no-op if the peer is
    /// disabled, the strategy never retries, or an attempt is already
    /// in flight.
    pub fn schedule_reconnect(self: &Arc<Self>) {
        match self.strategy.next_delay(1) {
            Some(delay) => self.spawn_attempt(delay),
            None => debug!(peer = self.peer, "strategy disables reconnect"),
        }
    }

    /// Abort a pending attempt and close the active connection, if
    /// any. Used when the peer is disabled or removed.
    pub async fn cancel(&self) {
        let handle = self.attempt.lock().unwrap().take();
        if let Some(handle) = handle {
            let mid_attempt = !handle.is_finished();
            handle.abort();
            // The abort can land between attempt start and completion;
            // the supervisor must not stay stuck in `Connecting`.
            if mid_attempt && self.supervisor.state() == LinkState::Connecting {
                let _ = self.supervisor.transition(LinkState::Disconnected);
            }
            debug!(peer = self.peer, "pending attempt cancelled");
        }
        let conn = self.active.lock().unwrap().take();
        if let Some(conn) = conn {
            conn.close().await;
            info!(peer = self.peer, "active connection closed");
        }
    }

    /// Spawn the attempt task unless one is already in flight.
    fn spawn_attempt(self: &Arc<Self>, initial_delay: Duration) {
        let mut slot = self.attempt.lock().unwrap();
        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                debug!(peer = self.peer, "attempt already in flight");
                return;
            }
        }
        if self.supervisor.is_disabled() {
            debug!(peer = self.peer, "peer disabled — not connecting");
            return;
        }
        if self.strategy.is_disabled() {
            debug!(peer = self.peer, "strategy disabled — not connecting");
            return;
        }
        let this = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            this.run_attempts(initial_delay).await;
        }));
    }

    /// One attempt cycle: try, and on failure sleep the strategy's
    /// delay and try again, until connected or told to stop.
    async fn run_attempts(self: Arc<Self>, initial_delay: Duration) {
        if initial_delay > Duration::ZERO {
            tokio::time::sleep(initial_delay).await;
        }
        let mut failures: u32 = 0;
        loop {
            if let Err(e) = self.supervisor.transition(LinkState::Connecting) {
                // Disabled (or otherwise moved on) while we waited.
                debug!(peer = self.peer, error = %e, "attempt abandoned");
                return;
            }
            match self.transport.connect(self.peer).await {
                Ok(conn) => {
                    if self.finish_connect(conn).await {
                        return;
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(peer = self.peer, error = %e, failures, "connect attempt failed");
                    if let Err(e) = self.supervisor.transition(LinkState::Disconnected) {
                        debug!(peer = self.peer, error = %e, "attempt abandoned");
                        return;
                    }
                    match self.strategy.next_delay(failures) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return,
                    }
                }
            }
        }
    }

    /// Land a successful attempt: mark the supervisor, record the
    /// active connection, and install the bootstrap handlers.
    ///
    /// Returns false if the peer was disabled while connecting and
    /// the connection had to be dropped.
    async fn finish_connect(&self, conn: Arc<dyn Conn>) -> bool {
        if self.supervisor.transition(LinkState::Connected).is_err() {
            // Disabled raced the attempt; drop the connection.
            conn.close().await;
            debug!(peer = self.peer, "connection dropped — peer disabled during attempt");
            return false;
        }
        let wiring = self.wiring.lock().unwrap().clone();
        let Some(wiring) = wiring else {
            // connect() installs wiring before any attempt runs.
            warn!(peer = self.peer, "connected without wiring — dropping");
            conn.close().await;
            return false;
        };
        *self.active.lock().unwrap() = Some(Arc::clone(&conn));
        wiring.listener.on_connection_changed(self.peer, true);
        for handler in &wiring.bootstraps {
            handler
                .on_connect(Arc::clone(&conn), Arc::clone(&wiring.termination))
                .await;
        }
        info!(peer = self.peer, "connected");
        true
    }

    /// Drop the active connection handle (termination path).
    pub(crate) async fn drop_active(&self) {
        let conn = self.active.lock().unwrap().take();
        if let Some(conn) = conn {
            conn.close().await;
        }
    }
}
