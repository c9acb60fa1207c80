//! Server side: operator command interpreter and inbound connection events.

use parking_lot::Mutex;

use crate::Flow;
use crate::broadcast::{broadcast, chat_line, logon_notice, server_notice};
use crate::command::{Command, parse_port};
use crate::connection::ConnectionId;
use crate::console::Console;
use crate::event::{ConnectionEvent, ListenerEvent, ServerEvent};
use crate::handshake::{HandshakeStep, LoginHandshake, REJECTION_NOTICE};
use crate::registry::{ConnectionRegistry, RegistryError};
use crate::transport::{ServerTransport, TransportError};

/// Listener state. `Closed` means not listening and no connections kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerRuntimeState {
    #[default]
    Closed,
    /// Not accepting, existing connections still served.
    Stopped,
    Listening,
}

impl ServerRuntimeState {
    pub fn is_listening(self) -> bool {
        self == Self::Listening
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    fn apply(self, event: ListenerEvent) -> Self {
        match (self, event) {
            (_, ListenerEvent::Started) => Self::Listening,
            (Self::Closed, ListenerEvent::Stopped) => Self::Closed,
            (_, ListenerEvent::Stopped) => Self::Stopped,
            (_, ListenerEvent::Closed) => Self::Closed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The chat server core. Safe to share between the console flow and the
/// connection flows; the registry and runtime state are internally locked.
pub struct ChatServer<T, C> {
    transport: T,
    console: C,
    registry: ConnectionRegistry,
    state: Mutex<ServerRuntimeState>,
}

impl<T: ServerTransport, C: Console> ChatServer<T, C> {
    pub fn new(transport: T, console: C) -> Self {
        Self {
            transport,
            console,
            registry: ConnectionRegistry::new(),
            state: Mutex::new(ServerRuntimeState::Closed),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn state(&self) -> ServerRuntimeState {
        *self.state.lock()
    }

    /// Begin listening. The state moves to `Listening` as soon as the
    /// transport accepts the request; failure is for the caller to report.
    pub fn start(&self) -> Result<(), TransportError> {
        self.transport.listen()?;
        self.transition(ListenerEvent::Started);
        Ok(())
    }

    /// Interpret one line typed at the server console.
    pub fn handle_line(&self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let Some(cmd) = Command::parse(line) else {
            let notice = server_notice(line);
            broadcast(&self.transport, &notice);
            self.console.display(&notice);
            return Flow::Continue;
        };

        match cmd.name {
            "#quit" => return self.quit(),
            "#stop" => {
                self.transport.stop_listening();
                self.transition(ListenerEvent::Stopped);
            }
            "#close" => match self.transport.close() {
                Ok(()) => self.transition(ListenerEvent::Closed),
                Err(e) => {
                    tracing::warn!("close failed: {}", e);
                    self.console.display("Error closing server");
                }
            },
            "#setport" => self.set_port(&cmd),
            "#start" => {
                if self.state().is_listening() {
                    self.console.display("Server has already been started");
                } else if let Err(e) = self.start() {
                    tracing::warn!("listen failed: {}", e);
                    self.console.display("Error starting server");
                }
            }
            "#getport" => self.console.display(&self.transport.port().to_string()),
            _ => self.console.display(&format!("Command {line} not found")),
        }
        Flow::Continue
    }

    /// Dispatch one transport event.
    pub fn handle_event(&self, event: ServerEvent) -> Result<(), ServerError> {
        match event {
            ServerEvent::Listener(event) => {
                self.on_listener_event(event);
                Ok(())
            }
            ServerEvent::Connection { id, event } => self.on_connection_event(id, event),
        }
    }

    fn quit(&self) -> Flow {
        match self.transport.close() {
            Ok(()) => {
                self.transition(ListenerEvent::Closed);
                self.console.display("Server terminated");
            }
            Err(e) => {
                tracing::warn!("close during quit failed: {}", e);
                self.console.display("Error quitting server");
            }
        }
        Flow::Terminate
    }

    fn set_port(&self, cmd: &Command<'_>) {
        let port = match parse_port(&cmd.args) {
            Ok(port) => port,
            Err(e) => return self.console.display(&e.to_string()),
        };
        if !self.state().is_closed() {
            return self.console.display("Server needs to be closed to set port");
        }
        self.transport.set_port(port);
        self.console.display(&format!("Port number set to {port}"));
    }

    fn transition(&self, event: ListenerEvent) {
        let mut state = self.state.lock();
        *state = state.apply(event);
    }

    fn on_listener_event(&self, event: ListenerEvent) {
        self.transition(event);
        match event {
            ListenerEvent::Started => tracing::info!(
                "Server listening for connections on port {}",
                self.transport.port()
            ),
            ListenerEvent::Stopped => {
                tracing::info!("Server has stopped listening for connections.")
            }
            ListenerEvent::Closed => {
                tracing::info!("Server has closed all connections to clients.")
            }
        }
    }

    fn on_connection_event(&self, id: ConnectionId, event: ConnectionEvent) -> Result<(), ServerError> {
        match event {
            ConnectionEvent::Connected => {
                self.registry.register(id)?;
                tracing::info!(%id, "A new client has connected to the server.");
            }
            ConnectionEvent::Message(text) => self.on_message(id, &text)?,
            ConnectionEvent::Disconnected => self.teardown(id),
            ConnectionEvent::Failed(cause) => {
                tracing::warn!(%id, "connection failed: {}", cause);
                self.teardown(id);
            }
        }
        Ok(())
    }

    fn on_message(&self, id: ConnectionId, text: &str) -> Result<(), ServerError> {
        match LoginHandshake::new(&self.registry).process(id, text)? {
            HandshakeStep::LoggedOn(login_id) => {
                tracing::info!("Message received: {} from {}", text, login_id);
                tracing::info!("{} has logged on", login_id);
                broadcast(&self.transport, &logon_notice(&login_id));
            }
            HandshakeStep::Chat(login_id) => {
                tracing::info!("Message received: {} from {}", text, login_id);
                broadcast(&self.transport, &chat_line(&login_id, text));
            }
            HandshakeStep::Malformed => {
                self.console
                    .display("Login command must follow #login <loginid> syntax");
            }
            HandshakeStep::Rejected => {
                tracing::warn!(%id, "first message was not a login, closing connection");
                if let Err(e) = self.transport.send_to(id, REJECTION_NOTICE) {
                    tracing::debug!(%id, "could not deliver rejection: {}", e);
                }
                if let Err(e) = self.transport.close_connection(id) {
                    tracing::debug!(%id, "connection already gone: {}", e);
                }
            }
            HandshakeStep::Dropped => {
                tracing::debug!(%id, "dropping message from rejected connection");
            }
        }
        Ok(())
    }

    /// The one cleanup path for both disconnects and failures. Runs its
    /// effects at most once per connection.
    fn teardown(&self, id: ConnectionId) {
        let Some(record) = self.registry.remove(id) else {
            return;
        };
        match record.login_id() {
            Some(login_id) => tracing::info!("{} has disconnected.", login_id),
            None => tracing::info!(%id, "connection closed before logging in"),
        }
    }
}
