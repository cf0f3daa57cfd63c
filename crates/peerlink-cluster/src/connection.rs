//! Per-connection value record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Configuration and status of one connection target.
///
/// `connected` is toggled by the network layer on transport events;
/// `disabled` is an operator override that suppresses connection
/// attempts without deleting the configuration. A disabled record is
/// never connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionRecord {
    id: String,
    host_description: String,
    connected: bool,
    disabled: bool,
}

impl ConnectionRecord {
    /// Create a record for a configured connection target.
    pub fn new(id: impl Into<String>, host_description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host_description: host_description.into(),
            connected: false,
            disabled: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host_description(&self) -> &str {
        &self.host_description
    }

    pub fn set_host_description(&mut self, host_description: impl Into<String>) {
        self.host_description = host_description.into();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Record a transport connect or disconnect event.
    ///
    /// Marking a disabled record connected is rejected.
    pub fn set_connected(&mut self, connected: bool) -> Result<(), StateError> {
        if connected && self.disabled {
            return Err(StateError::RecordDisabled {
                id: self.id.clone(),
            });
        }
        self.connected = connected;
        Ok(())
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Set the operator override. Disabling drops the connected flag.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.connected = false;
        }
    }
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionRecord{{id={}, host={}, connected={}, disabled={}}}",
            self.id, self.host_description, self.connected, self.disabled
        )
    }
}
