//! Session protocol and command dispatch for Huddle.
//!
//! This crate holds everything with a behavioral contract: the login
//! handshake, the per-connection registry, broadcast fan-out, and the
//! server and client command interpreters. Sockets, framing and tasks live
//! behind the [`ServerTransport`] and [`ClientTransport`] traits; output to
//! the operator or user goes through [`Console`].
//!
//! Transports report what happened as events ([`ServerEvent`],
//! [`SessionEvent`]); a single dispatch loop per process feeds them, along
//! with console lines, into [`ChatServer`] or [`ChatClient`].

mod broadcast;
mod client;
mod command;
mod config;
mod connection;
mod console;
mod event;
mod handshake;
mod registry;
mod server;
mod transport;

#[cfg(test)]
mod testutil;

pub use broadcast::{broadcast, chat_line, logon_notice, server_notice};
pub use client::ChatClient;
pub use command::{Command, CommandError, parse_port};
pub use config::{ClientConfig, ConfigError, DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
pub use connection::{ConnectionId, ConnectionRecord, LoginState};
pub use console::{Console, StdoutConsole};
pub use event::{ConnectionEvent, ListenerEvent, ServerEvent, SessionEvent};
pub use handshake::{HandshakeStep, LOGIN_COMMAND, LoginHandshake, REJECTION_NOTICE};
pub use registry::{ConnectionRegistry, RegistryError};
pub use server::{ChatServer, ServerError, ServerRuntimeState};
pub use transport::{ClientTransport, ServerTransport, TransportError};

/// What the caller should do after a line or event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep running.
    Continue,
    /// Shut the process down. Cleanup has already been attempted.
    Terminate,
}

impl Flow {
    pub fn is_terminate(self) -> bool {
        self == Flow::Terminate
    }
}
