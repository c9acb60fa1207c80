//! Recording fakes for the transport and console traits.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::connection::ConnectionId;
use crate::console::Console;
use crate::transport::{ClientTransport, ServerTransport, TransportError};

#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }
}

impl Console for RecordingConsole {
    fn display(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}

fn io_failure() -> TransportError {
    TransportError::Io(std::io::Error::other("simulated failure"))
}

#[derive(Debug, Default)]
pub struct FakeServerTransport {
    pub port: Mutex<u16>,
    pub fail_listen: Mutex<bool>,
    pub fail_close: Mutex<bool>,
    calls: Mutex<Vec<&'static str>>,
    open: Mutex<BTreeSet<ConnectionId>>,
    inbox: Mutex<BTreeMap<ConnectionId, Vec<String>>>,
    closed: Mutex<Vec<ConnectionId>>,
}

impl FakeServerTransport {
    pub fn with_port(port: u16) -> Self {
        let transport = Self::default();
        *transport.port.lock() = port;
        transport
    }

    pub fn open(&self, id: ConnectionId) {
        self.open.lock().insert(id);
    }

    pub fn received(&self, id: ConnectionId) -> Vec<String> {
        self.inbox.lock().get(&id).cloned().unwrap_or_default()
    }

    pub fn closed(&self) -> Vec<ConnectionId> {
        self.closed.lock().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl ServerTransport for FakeServerTransport {
    fn listen(&self) -> Result<(), TransportError> {
        self.calls.lock().push("listen");
        if *self.fail_listen.lock() {
            return Err(io_failure());
        }
        Ok(())
    }

    fn stop_listening(&self) {
        self.calls.lock().push("stop_listening");
    }

    fn close(&self) -> Result<(), TransportError> {
        self.calls.lock().push("close");
        if *self.fail_close.lock() {
            return Err(io_failure());
        }
        let ids: Vec<_> = std::mem::take(&mut *self.open.lock()).into_iter().collect();
        self.closed.lock().extend(ids);
        Ok(())
    }

    fn port(&self) -> u16 {
        *self.port.lock()
    }

    fn set_port(&self, port: u16) {
        *self.port.lock() = port;
    }

    fn send_to_all(&self, text: &str) {
        let open = self.open.lock();
        let mut inbox = self.inbox.lock();
        for id in open.iter() {
            inbox.entry(*id).or_default().push(text.to_string());
        }
    }

    fn send_to(&self, id: ConnectionId, text: &str) -> Result<(), TransportError> {
        if !self.open.lock().contains(&id) {
            return Err(TransportError::UnknownConnection(id));
        }
        self.inbox.lock().entry(id).or_default().push(text.to_string());
        Ok(())
    }

    fn close_connection(&self, id: ConnectionId) -> Result<(), TransportError> {
        if !self.open.lock().remove(&id) {
            return Err(TransportError::UnknownConnection(id));
        }
        self.closed.lock().push(id);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeClientTransport {
    pub connected: Mutex<bool>,
    pub host: Mutex<String>,
    pub port: Mutex<u16>,
    pub fail_send: Mutex<bool>,
    pub fail_close: Mutex<bool>,
    calls: Mutex<Vec<&'static str>>,
    sent: Mutex<Vec<String>>,
}

impl Default for FakeClientTransport {
    fn default() -> Self {
        Self {
            connected: Mutex::new(false),
            host: Mutex::new("localhost".into()),
            port: Mutex::new(5555),
            fail_send: Mutex::new(false),
            fail_close: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl FakeClientTransport {
    pub fn connected() -> Self {
        let transport = Self::default();
        *transport.connected.lock() = true;
        transport
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl ClientTransport for FakeClientTransport {
    fn open_connection(&self) -> Result<(), TransportError> {
        self.calls.lock().push("open_connection");
        if *self.connected.lock() {
            return Err(TransportError::AlreadyConnected);
        }
        Ok(())
    }

    fn close_connection(&self) -> Result<(), TransportError> {
        self.calls.lock().push("close_connection");
        if *self.fail_close.lock() {
            return Err(io_failure());
        }
        *self.connected.lock() = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    fn host(&self) -> String {
        self.host.lock().clone()
    }

    fn set_host(&self, host: &str) {
        *self.host.lock() = host.to_string();
    }

    fn port(&self) -> u16 {
        *self.port.lock()
    }

    fn set_port(&self, port: u16) {
        *self.port.lock() = port;
    }

    fn send_to_server(&self, text: &str) -> Result<(), TransportError> {
        if *self.fail_send.lock() || !*self.connected.lock() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}
