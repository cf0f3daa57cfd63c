//! In-memory doubles shared by the unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use crate::error::TransportError;
use crate::handler::{
    BootstrapHandler, ConnectionListener, TerminateReason, TerminationHandler,
};
use crate::peer::PeerId;
use crate::transport::{Conn, Frame, NetworkStatsListener, Transport, WireOutPublisher};

/// Channel-backed connection double.
pub(crate) struct MemoryConn {
    peer: PeerId,
    sent: Mutex<Vec<Frame>>,
    inbound: broadcast::Sender<Frame>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl MemoryConn {
    pub fn new(peer: PeerId) -> Arc<Self> {
        let (inbound, _) = broadcast::channel(64);
        let (closed_tx, closed_rx) = watch::channel(false);
        Arc::new(Self {
            peer,
            sent: Mutex::new(Vec::new()),
            inbound,
            closed_tx,
            closed_rx,
        })
    }

    /// Frames sent over this connection so far.
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliver a frame as if the peer had sent it.
    pub fn inject_inbound(&self, frame: Frame) {
        let _ = self.inbound.send(frame);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }
}

#[async_trait]
impl Conn for MemoryConn {
    fn peer(&self) -> PeerId {
        self.peer
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed { peer: self.peer });
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.inbound.subscribe()
    }

    fn closed(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    async fn close(&self) {
        let _ = self.closed_tx.send(true);
    }
}

/// Transport double that fails the first `fail_first` attempts and
/// records when each attempt was made.
pub(crate) struct MemoryTransport {
    fail_first: u32,
    attempts: AtomicU32,
    attempt_times: Mutex<Vec<Instant>>,
    conns: Mutex<Vec<Arc<MemoryConn>>>,
}

impl MemoryTransport {
    pub fn new(fail_first: u32) -> Self {
        Self {
            fail_first,
            attempts: AtomicU32::new(0),
            attempt_times: Mutex::new(Vec::new()),
            conns: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().unwrap().clone()
    }

    pub fn last_conn(&self) -> Option<Arc<MemoryConn>> {
        self.conns.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, peer: PeerId) -> Result<Arc<dyn Conn>, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempt_times.lock().unwrap().push(Instant::now());
        if attempt <= self.fail_first {
            return Err(TransportError::ConnectFailed {
                peer,
                reason: "connection refused".to_string(),
            });
        }
        let conn = MemoryConn::new(peer);
        self.conns.lock().unwrap().push(Arc::clone(&conn));
        Ok(conn)
    }
}

/// Transport double whose attempts never resolve.
pub(crate) struct PendingTransport;

#[async_trait]
impl Transport for PendingTransport {
    async fn connect(&self, _peer: PeerId) -> Result<Arc<dyn Conn>, TransportError> {
        std::future::pending().await
    }
}

/// Bootstrap handler double counting installations.
#[derive(Default)]
pub(crate) struct RecordingHandler {
    installs: AtomicU32,
}

impl RecordingHandler {
    pub fn installs(&self) -> u32 {
        self.installs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BootstrapHandler for RecordingHandler {
    async fn on_connect(
        &self,
        _conn: Arc<dyn Conn>,
        _termination: Arc<dyn TerminationHandler>,
    ) {
        self.installs.fetch_add(1, Ordering::SeqCst);
    }
}

/// Termination handler double recording invocation reasons.
#[derive(Default)]
pub(crate) struct RecordingTermination {
    reasons: Mutex<Vec<TerminateReason>>,
}

impl RecordingTermination {
    pub fn reasons(&self) -> Vec<TerminateReason> {
        self.reasons.lock().unwrap().clone()
    }
}

#[async_trait]
impl TerminationHandler for RecordingTermination {
    async fn on_terminate(&self, reason: TerminateReason) {
        self.reasons.lock().unwrap().push(reason);
    }
}

/// Listener double recording `(peer, connected)` events.
#[derive(Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<(PeerId, bool)>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<(PeerId, bool)> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionListener for RecordingListener {
    fn on_connection_changed(&self, peer: PeerId, connected: bool) {
        self.events.lock().unwrap().push((peer, connected));
    }
}

/// Listener that ignores everything.
pub(crate) struct NullListener;

impl ConnectionListener for NullListener {
    fn on_connection_changed(&self, _peer: PeerId, _connected: bool) {}
}

/// Debug-format publisher double.
pub(crate) struct NullPublisher;

impl WireOutPublisher for NullPublisher {
    fn publish(&self, frame: &Frame) -> Vec<u8> {
        format!("{frame:?}").into_bytes()
    }
}

/// Stats listener double recording `(peer, connected)` observations.
#[derive(Default)]
pub(crate) struct RecordingStats {
    events: Mutex<Vec<(PeerId, bool)>>,
}

impl RecordingStats {
    pub fn events(&self) -> Vec<(PeerId, bool)> {
        self.events.lock().unwrap().clone()
    }
}

impl NetworkStatsListener for RecordingStats {
    fn on_connected(&self, peer: PeerId) {
        self.events.lock().unwrap().push((peer, true));
    }

    fn on_disconnected(&self, peer: PeerId) {
        self.events.lock().unwrap().push((peer, false));
    }
}
