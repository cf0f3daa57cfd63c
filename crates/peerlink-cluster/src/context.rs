//! Cluster context — process-wide configuration and factory hub.
//!
//! Built once, either by fluent configuration calls or by streaming
//! field dispatch, then sealed: [`ClusterContextBuilder::build`]
//! produces an immutable [`ClusterContext`] that only manufactures
//! per-peer state. The host-join reaction
//! ([`ClusterContext::on_peer_discovered`]) wires one peer's strategy,
//! supervisor, connector, and notifier in a fixed order and starts
//! connecting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use peerlink_wire::{FieldTable, ParseError, decode};

use crate::config::FactoryRegistry;
use crate::connection::ConnectionRecord;
use crate::connector::Connector;
use crate::error::{ClusterResult, ConfigError};
use crate::handler::BootstrapHandler;
use crate::notifier::Notifier;
use crate::peer::{PeerId, PeerRecord};
use crate::strategy::ConnectionStrategy;
use crate::supervisor::Supervisor;
use crate::transport::{NetworkStatsListener, Transport, WireOutPublisher};

/// Codec used for connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    #[default]
    Text,
    Binary,
}

/// Server-side threading model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerThreadingStrategy {
    #[default]
    SingleThreaded,
    ConcurrentHandlers,
}

/// Produces the application bootstrap handler for one peer.
pub type HandlerFactory =
    Arc<dyn Fn(&ClusterContext, &PeerRecord) -> Arc<dyn BootstrapHandler> + Send + Sync>;

/// Produces the heartbeat bootstrap handler for one peer.
pub type HeartbeatFactory =
    Arc<dyn Fn(&ClusterContext) -> Arc<dyn BootstrapHandler> + Send + Sync>;

/// Produces the connection-state supervisor for one peer.
pub type SupervisorFactory = Arc<dyn Fn(PeerId) -> Supervisor + Send + Sync>;

/// Produces the per-connection context record.
pub type NetworkContextFactory =
    Arc<dyn Fn(&ClusterContext, PeerId) -> ConnectionRecord + Send + Sync>;

/// Produces the outbound publisher for a codec.
pub type WireOutPublisherFactory =
    Arc<dyn Fn(WireType) -> Arc<dyn WireOutPublisher> + Send + Sync>;

/// Produces the per-cluster stats observer.
pub type StatsListenerFactory =
    Arc<dyn Fn(&ClusterContext) -> Arc<dyn NetworkStatsListener> + Send + Sync>;

/// Factory reference names seen in the configuration stream, kept so
/// the recognized fields can be re-encoded.
#[derive(Debug, Clone, Default)]
struct FactoryRefs {
    handler: Option<String>,
    heartbeat: Option<String>,
    supervisor: Option<String>,
    network_context: Option<String>,
    publisher: Option<String>,
    stats: Option<String>,
}

/// Mutable configuration for one cluster, sealed by [`build`].
///
/// [`build`]: ClusterContextBuilder::build
#[derive(Clone)]
pub struct ClusterContextBuilder {
    wire_type: WireType,
    cluster_name: String,
    local_id: PeerId,
    heartbeat_interval_ms: u64,
    heartbeat_timeout_ms: u64,
    connection_strategy: ConnectionStrategy,
    threading_strategy: ServerThreadingStrategy,
    transport: Option<Arc<dyn Transport>>,
    handler_factory: Option<HandlerFactory>,
    heartbeat_factory: Option<HeartbeatFactory>,
    supervisor_factory: Option<SupervisorFactory>,
    network_context_factory: Option<NetworkContextFactory>,
    publisher_factory: Option<WireOutPublisherFactory>,
    stats_factory: Option<StatsListenerFactory>,
    refs: FactoryRefs,
}

impl Default for ClusterContextBuilder {
    fn default() -> Self {
        Self {
            wire_type: WireType::default(),
            cluster_name: String::new(),
            local_id: 0,
            heartbeat_interval_ms: 20_000,
            heartbeat_timeout_ms: 40_000,
            connection_strategy: ConnectionStrategy::default(),
            threading_strategy: ServerThreadingStrategy::default(),
            transport: None,
            handler_factory: None,
            heartbeat_factory: None,
            supervisor_factory: None,
            network_context_factory: None,
            publisher_factory: None,
            stats_factory: None,
            refs: FactoryRefs::default(),
        }
    }
}

impl ClusterContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default-initialize, then run the field-dispatch parser over an
    /// ordered stream of `(name, value)` pairs.
    pub fn from_stream(
        stream: &[(String, Value)],
        registry: &FactoryRegistry,
    ) -> Result<Self, ParseError> {
        let mut builder = Self::default();
        let table = field_table(registry.clone());
        table.apply(&mut builder, stream)?;
        Ok(builder)
    }

    pub fn with_wire_type(mut self, wire_type: WireType) -> Self {
        self.wire_type = wire_type;
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = name.into();
        self
    }

    pub fn with_local_id(mut self, id: PeerId) -> Self {
        self.local_id = id;
        self
    }

    pub fn with_heartbeat_interval_ms(mut self, interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = interval_ms;
        self
    }

    pub fn with_heartbeat_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.heartbeat_timeout_ms = timeout_ms;
        self
    }

    pub fn with_connection_strategy(mut self, strategy: ConnectionStrategy) -> Self {
        self.connection_strategy = strategy;
        self
    }

    pub fn with_threading_strategy(mut self, strategy: ServerThreadingStrategy) -> Self {
        self.threading_strategy = strategy;
        self
    }

    /// The transport-connect primitive. Required before any peer may
    /// be discovered.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_handler_factory(mut self, factory: HandlerFactory) -> Self {
        self.handler_factory = Some(factory);
        self
    }

    pub fn with_heartbeat_factory(mut self, factory: HeartbeatFactory) -> Self {
        self.heartbeat_factory = Some(factory);
        self
    }

    pub fn with_supervisor_factory(mut self, factory: SupervisorFactory) -> Self {
        self.supervisor_factory = Some(factory);
        self
    }

    pub fn with_network_context_factory(mut self, factory: NetworkContextFactory) -> Self {
        self.network_context_factory = Some(factory);
        self
    }

    pub fn with_wire_out_publisher_factory(mut self, factory: WireOutPublisherFactory) -> Self {
        self.publisher_factory = Some(factory);
        self
    }

    pub fn with_stats_listener_factory(mut self, factory: StatsListenerFactory) -> Self {
        self.stats_factory = Some(factory);
        self
    }

    /// Flag configurations the parser accepts but the cluster should
    /// not run with: the interval must be non-zero and at least one
    /// heartbeat must fit inside the timeout window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms == 0
            || self.heartbeat_interval_ms >= self.heartbeat_timeout_ms
        {
            return Err(ConfigError::InvalidHeartbeat {
                interval_ms: self.heartbeat_interval_ms,
                timeout_ms: self.heartbeat_timeout_ms,
            });
        }
        Ok(())
    }

    /// Seal the configuration. The resulting context is immutable and
    /// safely shared across all peer workflows.
    pub fn build(self) -> ClusterContext {
        ClusterContext {
            wire_type: self.wire_type,
            cluster_name: self.cluster_name,
            local_id: self.local_id,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
            connection_strategy: self.connection_strategy,
            threading_strategy: self.threading_strategy,
            transport: self.transport,
            handler_factory: self.handler_factory,
            heartbeat_factory: self.heartbeat_factory,
            supervisor_factory: self.supervisor_factory,
            network_context_factory: self.network_context_factory,
            publisher_factory: self.publisher_factory,
            stats_factory: self.stats_factory,
            refs: self.refs,
        }
    }
}

/// The dispatch table for the recognized configuration fields.
/// Factory-reference fields resolve through the registry.
fn field_table(registry: FactoryRegistry) -> FieldTable<ClusterContextBuilder> {
    let mut table = FieldTable::new();
    table.register("wireType", |b: &mut ClusterContextBuilder, v| {
        b.wire_type = decode("wireType", v)?;
        Ok(())
    });
    table.register("heartbeatTimeoutMs", |b: &mut ClusterContextBuilder, v| {
        b.heartbeat_timeout_ms = decode("heartbeatTimeoutMs", v)?;
        Ok(())
    });
    table.register("heartbeatIntervalMs", |b: &mut ClusterContextBuilder, v| {
        b.heartbeat_interval_ms = decode("heartbeatIntervalMs", v)?;
        Ok(())
    });
    table.register("connectionStrategy", |b: &mut ClusterContextBuilder, v| {
        b.connection_strategy = decode("connectionStrategy", v)?;
        Ok(())
    });
    table.register(
        "serverThreadingStrategy",
        |b: &mut ClusterContextBuilder, v| {
            b.threading_strategy = decode("serverThreadingStrategy", v)?;
            Ok(())
        },
    );

    let r = registry.clone();
    table.register("handlerFactory", move |b: &mut ClusterContextBuilder, v| {
        let name: String = decode("handlerFactory", v)?;
        b.handler_factory = Some(resolve("handlerFactory", &name, r.handler(&name))?);
        b.refs.handler = Some(name);
        Ok(())
    });
    let r = registry.clone();
    table.register("heartbeatFactory", move |b: &mut ClusterContextBuilder, v| {
        let name: String = decode("heartbeatFactory", v)?;
        b.heartbeat_factory = Some(resolve("heartbeatFactory", &name, r.heartbeat(&name))?);
        b.refs.heartbeat = Some(name);
        Ok(())
    });
    let r = registry.clone();
    table.register(
        "connectionEventHandler",
        move |b: &mut ClusterContextBuilder, v| {
            let name: String = decode("connectionEventHandler", v)?;
            b.supervisor_factory =
                Some(resolve("connectionEventHandler", &name, r.supervisor(&name))?);
            b.refs.supervisor = Some(name);
            Ok(())
        },
    );
    let r = registry.clone();
    table.register(
        "networkContextFactory",
        move |b: &mut ClusterContextBuilder, v| {
            let name: String = decode("networkContextFactory", v)?;
            b.network_context_factory =
                Some(resolve("networkContextFactory", &name, r.network_context(&name))?);
            b.refs.network_context = Some(name);
            Ok(())
        },
    );
    let r = registry.clone();
    table.register(
        "wireOutPublisherFactory",
        move |b: &mut ClusterContextBuilder, v| {
            let name: String = decode("wireOutPublisherFactory", v)?;
            b.publisher_factory =
                Some(resolve("wireOutPublisherFactory", &name, r.publisher(&name))?);
            b.refs.publisher = Some(name);
            Ok(())
        },
    );
    let r = registry;
    table.register(
        "networkStatsListenerFactory",
        move |b: &mut ClusterContextBuilder, v| {
            let name: String = decode("networkStatsListenerFactory", v)?;
            b.stats_factory =
                Some(resolve("networkStatsListenerFactory", &name, r.stats(&name))?);
            b.refs.stats = Some(name);
            Ok(())
        },
    );
    table
}

fn resolve<T>(field: &str, reference: &str, factory: Option<T>) -> Result<T, ParseError> {
    factory.ok_or_else(|| ParseError::UnknownFactory {
        field: field.to_string(),
        reference: reference.to_string(),
    })
}

/// Immutable-after-build configuration and factory registry for one
/// cluster. Owns none of the per-peer state; it only manufactures it.
pub struct ClusterContext {
    wire_type: WireType,
    cluster_name: String,
    local_id: PeerId,
    heartbeat_interval_ms: u64,
    heartbeat_timeout_ms: u64,
    connection_strategy: ConnectionStrategy,
    threading_strategy: ServerThreadingStrategy,
    transport: Option<Arc<dyn Transport>>,
    handler_factory: Option<HandlerFactory>,
    heartbeat_factory: Option<HeartbeatFactory>,
    supervisor_factory: Option<SupervisorFactory>,
    network_context_factory: Option<NetworkContextFactory>,
    publisher_factory: Option<WireOutPublisherFactory>,
    stats_factory: Option<StatsListenerFactory>,
    refs: FactoryRefs,
}

impl ClusterContext {
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    pub fn heartbeat_timeout_ms(&self) -> u64 {
        self.heartbeat_timeout_ms
    }

    pub fn connection_strategy(&self) -> &ConnectionStrategy {
        &self.connection_strategy
    }

    pub fn threading_strategy(&self) -> ServerThreadingStrategy {
        self.threading_strategy
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    pub fn network_context_factory(&self) -> Option<&NetworkContextFactory> {
        self.network_context_factory.as_ref()
    }

    pub fn wire_out_publisher_factory(&self) -> Option<&WireOutPublisherFactory> {
        self.publisher_factory.as_ref()
    }

    /// See [`ClusterContextBuilder::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms == 0
            || self.heartbeat_interval_ms >= self.heartbeat_timeout_ms
        {
            return Err(ConfigError::InvalidHeartbeat {
                interval_ms: self.heartbeat_interval_ms,
                timeout_ms: self.heartbeat_timeout_ms,
            });
        }
        Ok(())
    }

    /// Encode the recognized fields back into stream form. Factory
    /// fields appear only when they were set by reference.
    pub fn to_fields(&self) -> Vec<(String, Value)> {
        let mut fields = vec![
            ("wireType".to_string(), json!(self.wire_type)),
            (
                "heartbeatTimeoutMs".to_string(),
                json!(self.heartbeat_timeout_ms),
            ),
            (
                "heartbeatIntervalMs".to_string(),
                json!(self.heartbeat_interval_ms),
            ),
            (
                "connectionStrategy".to_string(),
                json!(self.connection_strategy.clone()),
            ),
            (
                "serverThreadingStrategy".to_string(),
                json!(self.threading_strategy),
            ),
        ];
        let refs = [
            ("handlerFactory", &self.refs.handler),
            ("heartbeatFactory", &self.refs.heartbeat),
            ("connectionEventHandler", &self.refs.supervisor),
            ("networkContextFactory", &self.refs.network_context),
            ("wireOutPublisherFactory", &self.refs.publisher),
            ("networkStatsListenerFactory", &self.refs.stats),
        ];
        for (name, reference) in refs {
            if let Some(reference) = reference {
                fields.push((name.to_string(), json!(reference.clone())));
            }
        }
        fields
    }

    /// The host-join reaction: wire one discovered peer and start
    /// connecting.
    ///
    /// A no-op when the peer is the local node. Fails fast, before
    /// constructing anything, if a required factory is missing — a
    /// context without a wired transport must never silently accept
    /// peers. Every instance created here is scoped to this one peer.
    pub fn on_peer_discovered(&self, record: &mut PeerRecord) -> ClusterResult<()> {
        let peer = record.peer_id();
        if peer == self.local_id {
            debug!(peer, "discovered self — nothing to wire");
            return Ok(());
        }

        let transport = self
            .transport
            .clone()
            .ok_or(ConfigError::MissingTransportFactory)?;
        let handler_factory = self
            .handler_factory
            .clone()
            .ok_or(ConfigError::MissingHandlerFactory)?;
        let heartbeat_factory = self
            .heartbeat_factory
            .clone()
            .ok_or(ConfigError::MissingHeartbeatFactory)?;

        let strategy = self.connection_strategy.clone();
        record.set_strategy(strategy.clone())?;

        let supervisor = Arc::new(match &self.supervisor_factory {
            Some(factory) => factory(peer),
            None => Supervisor::new(peer),
        });
        record.set_supervisor(Arc::clone(&supervisor))?;

        let connector = Arc::new(Connector::new(
            peer,
            transport,
            Arc::clone(&supervisor),
            strategy,
        ));
        record.set_connector(Arc::clone(&connector))?;

        let bootstraps = vec![handler_factory(self, record), heartbeat_factory(self)];
        let stats = self.stats_factory.as_ref().map(|factory| factory(self));
        let notifier = Arc::new(Notifier::new(supervisor, connector, bootstraps, stats));
        record.set_notifier(Arc::clone(&notifier))?;
        record.set_termination_handler(notifier.clone())?;

        info!(peer, host = record.host(), "peer wired — connecting");
        notifier.connect();
        Ok(())
    }
}
