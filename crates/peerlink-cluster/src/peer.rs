//! Per-peer record — the object graph wired on discovery.
//!
//! Created by the membership layer when a peer becomes known, wired
//! exactly once by the cluster context's host-join reaction, and
//! mutated by the supervisor and notifier through connect/disconnect
//! cycles. Connecting must not begin before wiring completes.

use std::sync::Arc;

use crate::connector::Connector;
use crate::error::StateError;
use crate::handler::TerminationHandler;
use crate::notifier::Notifier;
use crate::strategy::ConnectionStrategy;
use crate::supervisor::Supervisor;

/// Cluster peer identifier.
pub type PeerId = u16;

/// The per-peer object graph. Each slot is assigned exactly once
/// during the host-join reaction.
pub struct PeerRecord {
    peer_id: PeerId,
    host: String,
    strategy: Option<ConnectionStrategy>,
    supervisor: Option<Arc<Supervisor>>,
    connector: Option<Arc<Connector>>,
    notifier: Option<Arc<Notifier>>,
    termination: Option<Arc<dyn TerminationHandler>>,
}

impl PeerRecord {
    /// Create an unwired record for a discovered peer.
    pub fn new(peer_id: PeerId, host: impl Into<String>) -> Self {
        Self {
            peer_id,
            host: host.into(),
            strategy: None,
            supervisor: None,
            connector: None,
            notifier: None,
            termination: None,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn strategy(&self) -> Option<&ConnectionStrategy> {
        self.strategy.as_ref()
    }

    pub fn supervisor(&self) -> Option<&Arc<Supervisor>> {
        self.supervisor.as_ref()
    }

    pub fn connector(&self) -> Option<&Arc<Connector>> {
        self.connector.as_ref()
    }

    pub fn notifier(&self) -> Option<&Arc<Notifier>> {
        self.notifier.as_ref()
    }

    pub fn termination_handler(&self) -> Option<&Arc<dyn TerminationHandler>> {
        self.termination.as_ref()
    }

    /// True once every slot has been assigned.
    pub fn is_wired(&self) -> bool {
        self.strategy.is_some()
            && self.supervisor.is_some()
            && self.connector.is_some()
            && self.notifier.is_some()
            && self.termination.is_some()
    }

    pub fn set_strategy(&mut self, strategy: ConnectionStrategy) -> Result<(), StateError> {
        if self.strategy.is_some() {
            return Err(self.already_wired("strategy"));
        }
        self.strategy = Some(strategy);
        Ok(())
    }

    pub fn set_supervisor(&mut self, supervisor: Arc<Supervisor>) -> Result<(), StateError> {
        if self.supervisor.is_some() {
            return Err(self.already_wired("supervisor"));
        }
        self.supervisor = Some(supervisor);
        Ok(())
    }

    pub fn set_connector(&mut self, connector: Arc<Connector>) -> Result<(), StateError> {
        if self.connector.is_some() {
            return Err(self.already_wired("connector"));
        }
        self.connector = Some(connector);
        Ok(())
    }

    pub fn set_notifier(&mut self, notifier: Arc<Notifier>) -> Result<(), StateError> {
        if self.notifier.is_some() {
            return Err(self.already_wired("notifier"));
        }
        self.notifier = Some(notifier);
        Ok(())
    }

    pub fn set_termination_handler(
        &mut self,
        termination: Arc<dyn TerminationHandler>,
    ) -> Result<(), StateError> {
        if self.termination.is_some() {
            return Err(self.already_wired("termination"));
        }
        self.termination = Some(termination);
        Ok(())
    }

    /// Disable the peer: cancel any pending retry, close the active
    /// connection, and drive the supervisor to `Disabled`.
    pub async fn disable(&self) {
        if let Some(supervisor) = &self.supervisor {
            supervisor.disable();
        }
        if let Some(connector) = &self.connector {
            connector.cancel().await;
        }
    }

    fn already_wired(&self, slot: &'static str) -> StateError {
        StateError::AlreadyWired {
            peer: self.peer_id,
            slot,
        }
    }
}
