//! Server half of Huddle: the WebSocket transport the chat core runs on.
//!
//! The `huddle-server` binary wires [`WsServerTransport`] and a stdout
//! console into [`huddle_core::ChatServer`] and runs the dispatch loop.

mod transport;

pub use transport::WsServerTransport;
