//! Error types for the cluster connection-lifecycle engine.
//!
//! The error kinds are deliberately distinct: configuration errors are
//! fatal and fail fast, transport errors feed the retry loop, state
//! errors flag programming mistakes, and parse errors come from the
//! configuration stream.

use thiserror::Error;

use crate::peer::PeerId;
use crate::supervisor::LinkState;

/// Result type alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Umbrella error for cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] peerlink_wire::ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Fatal configuration errors.
///
/// A context missing a required factory must never silently skip a
/// discovered peer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No connection-handler (transport) factory was configured.
    #[error("no connection-handler factory configured — cannot wire discovered peers")]
    MissingTransportFactory,

    /// No application handler factory was configured.
    #[error("no application handler factory configured")]
    MissingHandlerFactory,

    /// No heartbeat handler factory was configured.
    #[error("no heartbeat factory configured")]
    MissingHeartbeatFactory,

    /// Heartbeat interval is zero or does not fit inside the timeout
    /// window.
    #[error("heartbeat interval {interval_ms}ms must be non-zero and less than timeout {timeout_ms}ms")]
    InvalidHeartbeat { interval_ms: u64, timeout_ms: u64 },
}

/// Transport-level failures. Never fatal: the connector records them
/// and retries per the connection strategy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to peer {peer} failed: {reason}")]
    ConnectFailed { peer: PeerId, reason: String },

    #[error("connection to peer {peer} is closed")]
    Closed { peer: PeerId },

    #[error("send to peer {peer} failed: {reason}")]
    Send { peer: PeerId, reason: String },
}

/// Programming-logic errors, reported distinctly from transport and
/// configuration failures and never silently ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// A supervisor was asked for a transition its state machine
    /// does not allow.
    #[error("peer {peer}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        peer: PeerId,
        from: LinkState,
        to: LinkState,
    },

    /// A peer-record slot was assigned twice during wiring.
    #[error("peer {peer}: `{slot}` assigned twice")]
    AlreadyWired { peer: PeerId, slot: &'static str },

    /// A disabled connection record was asked to mark itself connected.
    #[error("connection `{id}` is disabled and cannot be connected")]
    RecordDisabled { id: String },
}
