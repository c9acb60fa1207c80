//! Connection handles and the metadata the core keeps for each one.

use std::fmt;

/// Opaque handle for one network peer, minted by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection stands in the login handshake.
///
/// `AwaitingLogin` is the only non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Connected, first message not yet accepted.
    AwaitingLogin,
    /// Logged on under the given id. The id never changes afterwards.
    Authenticated(String),
    /// First message was not a login; the connection is being closed and
    /// anything else it sends is dropped.
    Rejected,
}

/// Per-connection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub handle: ConnectionId,
    pub state: LoginState,
}

impl ConnectionRecord {
    pub fn new(handle: ConnectionId) -> Self {
        Self {
            handle,
            state: LoginState::AwaitingLogin,
        }
    }

    /// The login id, once the handshake has completed.
    pub fn login_id(&self) -> Option<&str> {
        match &self.state {
            LoginState::Authenticated(id) => Some(id),
            _ => None,
        }
    }

    pub fn logged_in(&self) -> bool {
        matches!(self.state, LoginState::Authenticated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_awaits_login() {
        let record = ConnectionRecord::new(ConnectionId::new(7));
        assert_eq!(record.state, LoginState::AwaitingLogin);
        assert!(!record.logged_in());
        assert_eq!(record.login_id(), None);
    }

    #[test]
    fn authenticated_record_exposes_id() {
        let mut record = ConnectionRecord::new(ConnectionId::new(1));
        record.state = LoginState::Authenticated("alice".into());
        assert!(record.logged_in());
        assert_eq!(record.login_id(), Some("alice"));
    }

    #[test]
    fn display_handle() {
        assert_eq!(ConnectionId::new(42).to_string(), "conn-42");
    }
}
