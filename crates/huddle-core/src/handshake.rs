//! Server-side login handshake.
//!
//! A connection's first message must be `#login <id>`. Anything else as a
//! first message gets the connection rejected and closed. A `#login` with
//! the wrong number of arguments is only reported on the server console and
//! leaves the connection waiting; the client is not told. Once logged on,
//! every message is chat, including later `#login` lines.

use crate::connection::{ConnectionId, LoginState};
use crate::registry::{ConnectionRegistry, RegistryError};

pub const LOGIN_COMMAND: &str = "#login";

/// Sent to a connection right before it is closed for skipping the login.
pub const REJECTION_NOTICE: &str = "ERROR - #login must be the first command sent to the server";

/// What the server has to do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Login accepted under this id; announce it.
    LoggedOn(String),
    /// `#login` with the wrong argument count. Nothing changed.
    Malformed,
    /// First message was not a login. Notify and close the connection.
    Rejected,
    /// Ordinary chat from a logged-on connection with this id.
    Chat(String),
    /// The connection was already rejected; ignore the message.
    Dropped,
}

pub struct LoginHandshake<'a> {
    registry: &'a ConnectionRegistry,
}

impl<'a> LoginHandshake<'a> {
    pub fn new(registry: &'a ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Advance the handshake for `handle` with one inbound message.
    pub fn process(&self, handle: ConnectionId, text: &str) -> Result<HandshakeStep, RegistryError> {
        let record = self.registry.get(handle)?;
        match record.state {
            LoginState::Authenticated(id) => Ok(HandshakeStep::Chat(id)),
            LoginState::Rejected => Ok(HandshakeStep::Dropped),
            LoginState::AwaitingLogin => self.first_message(handle, text),
        }
    }

    fn first_message(&self, handle: ConnectionId, text: &str) -> Result<HandshakeStep, RegistryError> {
        let mut tokens = text.split_whitespace();
        if tokens.next() != Some(LOGIN_COMMAND) {
            self.registry.reject(handle)?;
            return Ok(HandshakeStep::Rejected);
        }

        let args: Vec<&str> = tokens.collect();
        let [id] = args.as_slice() else {
            return Ok(HandshakeStep::Malformed);
        };
        self.registry.set_login_id(handle, id)?;
        Ok(HandshakeStep::LoggedOn(id.to_string()))
    }
}
