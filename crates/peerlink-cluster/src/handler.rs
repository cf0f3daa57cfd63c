//! Capability traits at the seams of the lifecycle engine.
//!
//! The notifier implements both [`ConnectionListener`] and
//! [`TerminationHandler`]; keeping them as separate traits makes its
//! dual responsibility visible at the type level.

use std::sync::Arc;

use async_trait::async_trait;

use crate::peer::PeerId;
use crate::transport::Conn;

/// Why an active connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReason {
    /// The remote peer closed the connection.
    PeerClosed,
    /// A read or write failed.
    IoError,
    /// No liveness signal arrived within the timeout window.
    HeartbeatTimeout,
}

/// A protocol handler installed on every freshly established
/// connection for a peer. The application handler and the heartbeat
/// monitor both implement this and share the transport.
#[async_trait]
pub trait BootstrapHandler: Send + Sync {
    /// Install this handler on a new connection.
    ///
    /// Must not block: long-running protocol work is spawned onto the
    /// runtime, scoped to the connection's lifetime.
    async fn on_connect(&self, conn: Arc<dyn Conn>, termination: Arc<dyn TerminationHandler>);
}

/// Invoked whenever the active connection ends, closing the retry
/// loop so peer failures are self-healing.
#[async_trait]
pub trait TerminationHandler: Send + Sync {
    async fn on_terminate(&self, reason: TerminateReason);
}

/// Observer of connection-state changes for one peer.
pub trait ConnectionListener: Send + Sync {
    fn on_connection_changed(&self, peer: PeerId, connected: bool);
}
