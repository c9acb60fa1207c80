//! What the core needs from the networking layer.
//!
//! Implementations must not call back into the core from these methods;
//! lifecycle changes are reported afterwards as events.

use crate::connection::ConnectionId;

/// Server-side transport: one listener, many connections.
pub trait ServerTransport {
    /// Start accepting connections. Reports `ListenerEvent::Started`.
    fn listen(&self) -> Result<(), TransportError>;

    /// Stop accepting new connections; existing ones stay open.
    fn stop_listening(&self);

    /// Stop listening and disconnect every connection.
    fn close(&self) -> Result<(), TransportError>;

    fn port(&self) -> u16;

    fn set_port(&self, port: u16);

    /// Attempt delivery to every open connection. A failure on one
    /// connection does not stop delivery to the others.
    fn send_to_all(&self, text: &str);

    fn send_to(&self, id: ConnectionId, text: &str) -> Result<(), TransportError>;

    fn close_connection(&self, id: ConnectionId) -> Result<(), TransportError>;
}

/// Client-side transport: at most one connection to one server.
pub trait ClientTransport {
    /// Start connecting. Reports `SessionEvent::Established` or `Failed`.
    fn open_connection(&self) -> Result<(), TransportError>;

    fn close_connection(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    fn host(&self) -> String;

    fn set_host(&self, host: &str);

    fn port(&self) -> u16;

    fn set_port(&self, port: u16);

    fn send_to_server(&self, text: &str) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("could not connect: {0}")]
    ConnectFailed(String),
    #[error("outbound queue full")]
    QueueFull,
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}
