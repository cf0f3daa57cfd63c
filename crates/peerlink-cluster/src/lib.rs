//! peerlink-cluster — connection lifecycle for a peer cluster.
//!
//! Keeps point-to-point links alive under failure: detects dead peers
//! via heartbeats, re-establishes connections automatically, and wires
//! the per-peer object graph exactly once when a peer is discovered.
//!
//! # Architecture
//!
//! ```text
//! ClusterContext (immutable after build)
//!   ├── built by fluent calls or the field-dispatch stream
//!   └── on_peer_discovered(PeerRecord)
//!         ├── ConnectionStrategy (retry policy, pure)
//!         ├── Supervisor (state machine: Disabled/Disconnected/
//!         │               Connecting/Connected)
//!         ├── Connector (one attempt task per peer, retries per
//!         │              strategy, installs bootstrap handlers)
//!         └── Notifier (ConnectionListener + TerminationHandler;
//!               ├── application bootstrap handler
//!               └── HeartbeatMonitor (liveness per connection)
//!               closes the retry loop on every termination)
//! ```
//!
//! The transport itself — sockets, codecs, the request/response
//! protocol — lives behind the [`Transport`] and [`Conn`] traits.

pub mod config;
pub mod connection;
pub mod connector;
pub mod context;
pub mod error;
pub mod handler;
pub mod heartbeat;
pub mod notifier;
pub mod peer;
pub mod strategy;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::FactoryRegistry;
pub use connection::ConnectionRecord;
pub use connector::Connector;
pub use context::{
    ClusterContext, ClusterContextBuilder, HandlerFactory, HeartbeatFactory,
    NetworkContextFactory, ServerThreadingStrategy, StatsListenerFactory, SupervisorFactory,
    WireOutPublisherFactory, WireType,
};
pub use error::{ClusterError, ClusterResult, ConfigError, StateError, TransportError};
pub use handler::{BootstrapHandler, ConnectionListener, TerminateReason, TerminationHandler};
pub use heartbeat::HeartbeatMonitor;
pub use notifier::Notifier;
pub use peer::{PeerId, PeerRecord};
pub use strategy::ConnectionStrategy;
pub use supervisor::{LinkState, Supervisor};
pub use transport::{Conn, Frame, NetworkStatsListener, Transport, WireOutPublisher};
