//! Abstract transport interfaces consumed by the core.
//!
//! The socket read/write mechanics live outside this crate; the
//! lifecycle engine only needs a connect primitive yielding a
//! connection handle, frame send/receive on that handle, and a
//! close signal.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::TransportError;
use crate::peer::PeerId;

/// A protocol frame carried over an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Liveness signal.
    Heartbeat,
    /// Application payload, opaque to the lifecycle engine.
    App(Vec<u8>),
}

/// An established connection to one peer.
#[async_trait]
pub trait Conn: Send + Sync {
    /// The remote peer.
    fn peer(&self) -> PeerId;

    /// Send one frame.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Subscribe to inbound frames. Both bootstrap handlers share the
    /// transport, so inbound frames fan out to every subscriber.
    fn subscribe(&self) -> broadcast::Receiver<Frame>;

    /// Watch channel that flips to `true` when the connection closes.
    fn closed(&self) -> watch::Receiver<bool>;

    /// Close the connection.
    async fn close(&self);
}

/// Transport-connect primitive: one physical attempt to reach a peer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, peer: PeerId) -> Result<Arc<dyn Conn>, TransportError>;
}

/// Outbound publisher for a selected codec. Produced per wire type by
/// the configured publisher factory; consumed by transport
/// implementations, not by the lifecycle engine itself.
pub trait WireOutPublisher: Send + Sync {
    /// Encode one frame for the wire.
    fn publish(&self, frame: &Frame) -> Vec<u8>;
}

/// Observer of per-peer connection statistics.
pub trait NetworkStatsListener: Send + Sync {
    /// An active connection to `peer` was established.
    fn on_connected(&self, peer: PeerId);

    /// The active connection to `peer` ended.
    fn on_disconnected(&self, peer: PeerId);
}
