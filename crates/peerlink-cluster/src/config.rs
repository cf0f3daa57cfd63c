//! Factory registry — resolves factory references from the
//! configuration stream.
//!
//! The stream carries factory fields as string references; the
//! registry is the explicit mapping from reference name to registered
//! factory, replacing reflective typed construction. An unknown
//! reference is a decode failure for that field.

use std::collections::HashMap;

use crate::context::{
    HandlerFactory, HeartbeatFactory, NetworkContextFactory, StatsListenerFactory,
    SupervisorFactory, WireOutPublisherFactory,
};

/// Registered factories, keyed by the reference names the
/// configuration stream uses.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    handlers: HashMap<String, HandlerFactory>,
    heartbeats: HashMap<String, HeartbeatFactory>,
    supervisors: HashMap<String, SupervisorFactory>,
    network_contexts: HashMap<String, NetworkContextFactory>,
    publishers: HashMap<String, WireOutPublisherFactory>,
    stats: HashMap<String, StatsListenerFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, name: impl Into<String>, factory: HandlerFactory) -> Self {
        self.handlers.insert(name.into(), factory);
        self
    }

    pub fn with_heartbeat(mut self, name: impl Into<String>, factory: HeartbeatFactory) -> Self {
        self.heartbeats.insert(name.into(), factory);
        self
    }

    pub fn with_supervisor(mut self, name: impl Into<String>, factory: SupervisorFactory) -> Self {
        self.supervisors.insert(name.into(), factory);
        self
    }

    pub fn with_network_context(
        mut self,
        name: impl Into<String>,
        factory: NetworkContextFactory,
    ) -> Self {
        self.network_contexts.insert(name.into(), factory);
        self
    }

    pub fn with_publisher(
        mut self,
        name: impl Into<String>,
        factory: WireOutPublisherFactory,
    ) -> Self {
        self.publishers.insert(name.into(), factory);
        self
    }

    pub fn with_stats(mut self, name: impl Into<String>, factory: StatsListenerFactory) -> Self {
        self.stats.insert(name.into(), factory);
        self
    }

    pub fn handler(&self, name: &str) -> Option<HandlerFactory> {
        self.handlers.get(name).cloned()
    }

    pub fn heartbeat(&self, name: &str) -> Option<HeartbeatFactory> {
        self.heartbeats.get(name).cloned()
    }

    pub fn supervisor(&self, name: &str) -> Option<SupervisorFactory> {
        self.supervisors.get(name).cloned()
    }

    pub fn network_context(&self, name: &str) -> Option<NetworkContextFactory> {
        self.network_contexts.get(name).cloned()
    }

    pub fn publisher(&self, name: &str) -> Option<WireOutPublisherFactory> {
        self.publishers.get(name).cloned()
    }

    pub fn stats(&self, name: &str) -> Option<StatsListenerFactory> {
        self.stats.get(name).cloned()
    }
}
