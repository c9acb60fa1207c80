//! Lifecycle events reported by the transports.

use crate::connection::ConnectionId;

/// Something that happened on one server-side connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Message(String),
    Disconnected,
    /// Transport-detected fault. Cleanup is the same as for `Disconnected`.
    Failed(String),
}

/// Listener lifecycle on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    /// Accepting connections.
    Started,
    /// No longer accepting; existing connections stay up.
    Stopped,
    /// Listener stopped and every connection dropped.
    Closed,
}

/// Everything a server transport reports, in one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Listener(ListenerEvent),
    Connection {
        id: ConnectionId,
        event: ConnectionEvent,
    },
}

impl ServerEvent {
    pub fn connection(id: ConnectionId, event: ConnectionEvent) -> Self {
        Self::Connection { id, event }
    }
}

/// What a client transport reports about its single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Established,
    Message(String),
    /// Closed cleanly, by either side.
    Closed,
    Failed(String),
}
