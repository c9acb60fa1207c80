//! WebSocket transport for the server.
//!
//! One accept task plus one task per connection. Everything that happens is
//! pushed onto an unbounded channel as a [`ServerEvent`]; the dispatch loop
//! feeds those into the core. Outbound traffic per connection is bounded; a
//! peer that stops reading is disconnected once its queue fills.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_core::{
    ConnectionEvent, ConnectionId, ListenerEvent, ServerEvent, ServerTransport, TransportError,
};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

/// Frames queued per connection before it counts as lagging.
const OUTBOUND_CAPACITY: usize = 100;

enum Outbound {
    Text(String),
    Close,
}

struct Inner {
    port: Mutex<u16>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    connections: Mutex<HashMap<ConnectionId, mpsc::Sender<Outbound>>>,
    /// Bumped by every `close`, under the `connections` lock. A handshake
    /// that started in an older epoch is turned away.
    epoch: AtomicU64,
    next_id: AtomicU64,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl Inner {
    fn emit(&self, event: ServerEvent) {
        // The receiver only goes away when the process is shutting down.
        let _ = self.events.send(event);
    }
}

/// Server transport over WebSockets. Cheap to clone.
///
/// `listen` must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct WsServerTransport {
    inner: Arc<Inner>,
}

impl WsServerTransport {
    pub fn new(port: u16, events: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                port: Mutex::new(port),
                accept_task: Mutex::new(None),
                connections: Mutex::new(HashMap::new()),
                epoch: AtomicU64::new(0),
                next_id: AtomicU64::new(1),
                events,
            }),
        }
    }
}

impl ServerTransport for WsServerTransport {
    fn listen(&self) -> Result<(), TransportError> {
        let mut accept_task = self.inner.accept_task.lock();
        if accept_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let port = *self.inner.port.lock();
        let listener = std::net::TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        // Port 0 asks the OS to pick; report what we actually got.
        let bound = listener.local_addr()?.port();
        *self.inner.port.lock() = bound;

        *accept_task = Some(tokio::spawn(accept_loop(listener, self.inner.clone())));
        tracing::debug!("Listening on ws://0.0.0.0:{}", bound);
        self.inner.emit(ServerEvent::Listener(ListenerEvent::Started));
        Ok(())
    }

    fn stop_listening(&self) {
        if let Some(task) = self.inner.accept_task.lock().take() {
            task.abort();
            self.inner.emit(ServerEvent::Listener(ListenerEvent::Stopped));
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.stop_listening();
        let connections = {
            let mut connections = self.inner.connections.lock();
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            std::mem::take(&mut *connections)
        };
        for (id, tx) in connections {
            // A full queue is fine: dropping the sender closes it once drained.
            if let Err(TrySendError::Closed(_)) = tx.try_send(Outbound::Close) {
                tracing::debug!(%id, "connection already gone");
            }
        }
        self.inner.emit(ServerEvent::Listener(ListenerEvent::Closed));
        Ok(())
    }

    fn port(&self) -> u16 {
        *self.inner.port.lock()
    }

    fn set_port(&self, port: u16) {
        *self.inner.port.lock() = port;
    }

    fn send_to_all(&self, text: &str) {
        self.inner.connections.lock().retain(|id, tx| {
            match tx.try_send(Outbound::Text(text.to_string())) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%id, "outbound queue full, disconnecting");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%id, "skipping closed connection");
                    true
                }
            }
        });
    }

    fn send_to(&self, id: ConnectionId, text: &str) -> Result<(), TransportError> {
        let connections = self.inner.connections.lock();
        let tx = connections
            .get(&id)
            .ok_or(TransportError::UnknownConnection(id))?;
        tx.try_send(Outbound::Text(text.to_string()))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::QueueFull,
                TrySendError::Closed(_) => TransportError::UnknownConnection(id),
            })
    }

    fn close_connection(&self, id: ConnectionId) -> Result<(), TransportError> {
        let tx = self
            .inner
            .connections
            .lock()
            .remove(&id)
            .ok_or(TransportError::UnknownConnection(id))?;
        match tx.try_send(Outbound::Close) {
            Err(TrySendError::Closed(_)) => Err(TransportError::UnknownConnection(id)),
            // Full: the dropped sender ends the connection after the backlog.
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
        }
    }
}

async fn accept_loop(listener: TcpListener, inner: Arc<Inner>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let id = ConnectionId::new(inner.next_id.fetch_add(1, Ordering::Relaxed));
                let epoch = inner.epoch.load(Ordering::SeqCst);
                tokio::spawn(serve_connection(stream, addr, id, epoch, inner.clone()));
            }
            Err(e) => {
                tracing::warn!("accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    epoch: u64,
    inner: Arc<Inner>,
) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%addr, "websocket handshake failed: {}", e);
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let admitted = {
        let mut connections = inner.connections.lock();
        let current = inner.epoch.load(Ordering::SeqCst) == epoch;
        if current {
            connections.insert(id, tx);
        }
        current
    };
    if !admitted {
        tracing::debug!(%addr, "server closed during handshake");
        let _ = ws.close(None).await;
        return;
    }
    tracing::debug!(%id, "New connection from {}", addr);
    inner.emit(ServerEvent::connection(id, ConnectionEvent::Connected));

    let outcome = pump(ws, &mut rx, id, &inner).await;
    inner.connections.lock().remove(&id);

    let event = match outcome {
        Ok(()) => ConnectionEvent::Disconnected,
        Err(e) => ConnectionEvent::Failed(e.to_string()),
    };
    tracing::debug!(%id, "Connection closed: {}", addr);
    inner.emit(ServerEvent::connection(id, event));
}

async fn pump(
    ws: WebSocketStream<TcpStream>,
    rx: &mut mpsc::Receiver<Outbound>,
    id: ConnectionId,
    inner: &Inner,
) -> Result<(), tungstenite::Error> {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_owned();
                    inner.emit(ServerEvent::connection(id, ConnectionEvent::Message(text)));
                }
                Some(Ok(Message::Close(_))) | None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            },
            out = rx.recv() => match out {
                Some(Outbound::Text(text)) => sink.send(Message::Text(text.into())).await?,
                Some(Outbound::Close) | None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
        }
    }
}
