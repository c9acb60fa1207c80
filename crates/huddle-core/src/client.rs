//! Client side: user command interpreter and connection lifecycle.

use crate::Flow;
use crate::command::{Command, parse_port};
use crate::console::Console;
use crate::event::SessionEvent;
use crate::handshake::LOGIN_COMMAND;
use crate::transport::{ClientTransport, TransportError};

const SEND_FAILED: &str = "Could not send message to server.  Terminating client.";

/// One user's chat session. The login id is fixed for the life of the
/// session and re-sent on every new connection.
pub struct ChatClient<T, C> {
    login_id: String,
    transport: T,
    console: C,
}

impl<T: ClientTransport, C: Console> ChatClient<T, C> {
    pub fn new(login_id: impl Into<String>, transport: T, console: C) -> Self {
        Self {
            login_id: login_id.into(),
            transport,
            console,
        }
    }

    pub fn login_id(&self) -> &str {
        &self.login_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Open the initial connection at startup.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.transport.open_connection()
    }

    /// Interpret one line typed by the user.
    pub fn handle_line(&self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let Some(cmd) = Command::parse(line) else {
            return match self.transport.send_to_server(line) {
                Ok(()) => Flow::Continue,
                Err(e) => self.abort(e),
            };
        };

        match cmd.name {
            "#quit" => return self.quit(),
            "#logoff" => {
                if !self.transport.is_connected() {
                    self.console
                        .display("Client is already logged off (disconnected from server)");
                } else if let Err(e) = self.transport.close_connection() {
                    return self.abort(e);
                }
            }
            "#sethost" => match cmd.single_arg("#sethost <host>") {
                Err(e) => self.console.display(&e.to_string()),
                Ok(_) if self.transport.is_connected() => self.console.display(
                    "Client needs to be logged off (disconnected from server) to set host",
                ),
                Ok(host) => {
                    self.transport.set_host(host);
                    self.console.display(&format!("Host set to {host}"));
                }
            },
            "#setport" => match parse_port(&cmd.args) {
                Err(e) => self.console.display(&e.to_string()),
                Ok(_) if self.transport.is_connected() => self.console.display(
                    "Client needs to be logged off (disconnected from server) to set port",
                ),
                Ok(port) => {
                    self.transport.set_port(port);
                    self.console.display(&format!("Port number set to {port}"));
                }
            },
            "#login" => {
                if self.transport.is_connected() {
                    self.already_logged_in();
                } else {
                    match self.transport.open_connection() {
                        Ok(()) => {}
                        Err(TransportError::AlreadyConnected) => self.already_logged_in(),
                        Err(e) => return self.abort(e),
                    }
                }
            }
            "#gethost" => self.console.display(&self.transport.host()),
            "#getport" => self.console.display(&self.transport.port().to_string()),
            _ => self.console.display(&format!("Command {line} not found")),
        }
        Flow::Continue
    }

    /// React to a transport lifecycle event.
    pub fn handle_event(&self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Established => {
                self.console.display("Connection to server established");
                let login = format!("{LOGIN_COMMAND} {}", self.login_id);
                if let Err(e) = self.transport.send_to_server(&login) {
                    return self.abort(e);
                }
            }
            SessionEvent::Message(text) => self.console.display(&text),
            SessionEvent::Closed => self.console.display("Connection to server closed"),
            SessionEvent::Failed(cause) => {
                tracing::warn!("connection failed: {}", cause);
                self.console.display("The server has shut down");
                return self.quit();
            }
        }
        Flow::Continue
    }

    /// Close the connection if open and ask for process termination.
    pub fn quit(&self) -> Flow {
        let closed = if self.transport.is_connected() {
            self.transport.close_connection()
        } else {
            Ok(())
        };
        match closed {
            Ok(()) => self.console.display("Client terminated"),
            Err(e) => {
                tracing::warn!("close during quit failed: {}", e);
                self.console.display("Error quitting client");
            }
        }
        Flow::Terminate
    }

    fn already_logged_in(&self) {
        self.console
            .display("Client is already logged in (connected to server)");
    }

    fn abort(&self, cause: TransportError) -> Flow {
        tracing::warn!("transport failure: {}", cause);
        self.console.display(SEND_FAILED);
        self.quit()
    }
}
