//! Connection-state supervisor — per-peer state machine.
//!
//! Transitions are driven externally (the connector on attempt start
//! and success, the notifier on termination); the supervisor performs
//! no I/O. It only tracks state, answers queries, and rejects invalid
//! transitions as logic errors.

use std::sync::Mutex;

use tracing::debug;

use crate::error::StateError;
use crate::peer::PeerId;

/// Connection state of one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Operator override: no connect attempts are made.
    Disabled,
    /// No connection and no attempt in flight.
    Disconnected,
    /// One attempt in flight.
    Connecting,
    /// An active connection exists.
    Connected,
}

/// Per-peer connection-state supervisor.
///
/// Structurally enforces at most one attempt in flight and one active
/// connection per peer: `Connecting` and `Connected` can only be
/// entered from the states that preceded them.
#[derive(Debug)]
pub struct Supervisor {
    peer: PeerId,
    state: Mutex<LinkState>,
}

impl Supervisor {
    /// Create a supervisor in the `Disconnected` state.
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            state: Mutex::new(LinkState::Disconnected),
        }
    }

    /// The peer this supervisor tracks.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap()
    }

    /// True if the peer is disabled.
    pub fn is_disabled(&self) -> bool {
        self.state() == LinkState::Disabled
    }

    /// Request a transition to `to`.
    ///
    /// Returns the previous state, or a [`StateError::InvalidTransition`]
    /// if the state machine does not allow it.
    pub fn transition(&self, to: LinkState) -> Result<LinkState, StateError> {
        let mut state = self.state.lock().unwrap();
        let from = *state;
        if !allowed(from, to) {
            return Err(StateError::InvalidTransition {
                peer: self.peer,
                from,
                to,
            });
        }
        *state = to;
        debug!(peer = self.peer, ?from, ?to, "link state transition");
        Ok(from)
    }

    /// Disable the peer. Wins over every other state.
    pub fn disable(&self) {
        let mut state = self.state.lock().unwrap();
        let from = *state;
        *state = LinkState::Disabled;
        debug!(peer = self.peer, ?from, "link disabled");
    }

    /// Re-enable a disabled peer, returning it to `Disconnected`.
    pub fn enable(&self) -> Result<(), StateError> {
        self.transition(LinkState::Disconnected).map(|_| ())
    }
}

/// Allowed transitions: `Disabled` is reachable from anywhere and
/// leaves only to `Disconnected`; the connect cycle is
/// `Disconnected -> Connecting -> Connected -> Disconnected`, with
/// `Connecting -> Disconnected` on a failed attempt.
fn allowed(from: LinkState, to: LinkState) -> bool {
    use LinkState::*;
    matches!(
        (from, to),
        (_, Disabled)
            | (Disabled, Disconnected)
            | (Disconnected, Connecting)
            | (Connecting, Connected)
            | (Connecting, Disconnected)
            | (Connected, Disconnected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let s = Supervisor::new(3);
        assert_eq!(s.state(), LinkState::Disconnected);
        assert_eq!(s.peer(), 3);
    }

    #[test]
    fn full_connect_cycle() {
        let s = Supervisor::new(1);
        assert_eq!(s.transition(LinkState::Connecting).unwrap(), LinkState::Disconnected);
        assert_eq!(s.transition(LinkState::Connected).unwrap(), LinkState::Connecting);
        assert_eq!(s.transition(LinkState::Disconnected).unwrap(), LinkState::Connected);
    }

    #[test]
    fn failed_attempt_returns_to_disconnected() {
        let s = Supervisor::new(1);
        s.transition(LinkState::Connecting).unwrap();
        s.transition(LinkState::Disconnected).unwrap();
        assert_eq!(s.state(), LinkState::Disconnected);
    }

    #[test]
    fn overlapping_attempt_is_rejected() {
        let s = Supervisor::new(7);
        s.transition(LinkState::Connecting).unwrap();
        let err = s.transition(LinkState::Connecting).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                peer: 7,
                from: LinkState::Connecting,
                to: LinkState::Connecting,
            }
        );
    }

    #[test]
    fn cannot_connect_from_disconnected_directly() {
        let s = Supervisor::new(1);
        assert!(s.transition(LinkState::Connected).is_err());
    }

    #[test]
    fn disable_wins_from_any_state() {
        let s = Supervisor::new(1);
        s.transition(LinkState::Connecting).unwrap();
        s.transition(LinkState::Connected).unwrap();
        s.disable();
        assert!(s.is_disabled());
        // No attempts while disabled.
        assert!(s.transition(LinkState::Connecting).is_err());
        assert!(s.transition(LinkState::Connected).is_err());
    }

    #[test]
    fn enable_returns_to_disconnected() {
        let s = Supervisor::new(1);
        s.disable();
        s.enable().unwrap();
        assert_eq!(s.state(), LinkState::Disconnected);
    }
}
