//! WebSocket transport for the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use huddle_core::{ClientTransport, SessionEvent, TransportError};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTBOUND_CAPACITY: usize = 100;

enum Outbound {
    Text(String),
    Close,
}

/// State of the single link. Each connection attempt gets a new generation
/// so a finished task never clobbers a newer attempt.
enum Link {
    Down,
    Connecting(u64),
    Up(u64, mpsc::Sender<Outbound>),
}

impl Link {
    fn generation(&self) -> Option<u64> {
        match self {
            Link::Down => None,
            Link::Connecting(generation) | Link::Up(generation, _) => Some(*generation),
        }
    }
}

struct Inner {
    host: Mutex<String>,
    port: Mutex<u16>,
    link: Mutex<Link>,
    generation: AtomicU64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Inner {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Mark the link down, unless a newer attempt has taken over.
    fn release(&self, generation: u64) {
        let mut link = self.link.lock();
        if link.generation() == Some(generation) {
            *link = Link::Down;
        }
    }
}

/// Client transport over WebSockets. Cheap to clone.
///
/// `open_connection` must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct WsClientTransport {
    inner: Arc<Inner>,
}

impl WsClientTransport {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host: Mutex::new(host.into()),
                port: Mutex::new(port),
                link: Mutex::new(Link::Down),
                generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    fn url(&self) -> String {
        format!("ws://{}:{}", self.inner.host.lock(), self.inner.port.lock())
    }
}

impl ClientTransport for WsClientTransport {
    fn open_connection(&self) -> Result<(), TransportError> {
        let mut link = self.inner.link.lock();
        if !matches!(*link, Link::Down) {
            return Err(TransportError::AlreadyConnected);
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        *link = Link::Connecting(generation);
        drop(link);

        let url = self.url();
        tracing::debug!("Connecting to {}", url);
        tokio::spawn(run_connection(url, generation, self.inner.clone()));
        Ok(())
    }

    fn close_connection(&self) -> Result<(), TransportError> {
        match std::mem::replace(&mut *self.inner.link.lock(), Link::Down) {
            Link::Up(_, tx) => {
                // Either the task already finished, or dropping `tx` ends it
                // once the backlog is written.
                let _ = tx.try_send(Outbound::Close);
            }
            Link::Connecting(_) | Link::Down => {}
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        matches!(*self.inner.link.lock(), Link::Up(..))
    }

    fn host(&self) -> String {
        self.inner.host.lock().clone()
    }

    fn set_host(&self, host: &str) {
        *self.inner.host.lock() = host.to_string();
    }

    fn port(&self) -> u16 {
        *self.inner.port.lock()
    }

    fn set_port(&self, port: u16) {
        *self.inner.port.lock() = port;
    }

    fn send_to_server(&self, text: &str) -> Result<(), TransportError> {
        match &*self.inner.link.lock() {
            Link::Up(_, tx) => {
                tx.try_send(Outbound::Text(text.to_string()))
                    .map_err(|e| match e {
                        TrySendError::Full(_) => TransportError::QueueFull,
                        TrySendError::Closed(_) => TransportError::NotConnected,
                    })
            }
            Link::Connecting(_) | Link::Down => Err(TransportError::NotConnected),
        }
    }
}

async fn run_connection(url: String, generation: u64, inner: Arc<Inner>) {
    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            inner.release(generation);
            inner.emit(SessionEvent::Failed(format!("could not connect to {url}: {e}")));
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let superseded = {
        let mut link = inner.link.lock();
        if link.generation() == Some(generation) {
            *link = Link::Up(generation, tx);
            false
        } else {
            true
        }
    };
    if superseded {
        // Closed while the handshake was in flight.
        let mut ws = ws;
        let _ = ws.close(None).await;
        inner.emit(SessionEvent::Closed);
        return;
    }
    inner.emit(SessionEvent::Established);

    let outcome = pump(ws, &mut rx, &inner).await;
    inner.release(generation);
    inner.emit(match outcome {
        Ok(()) => SessionEvent::Closed,
        Err(e) => SessionEvent::Failed(e.to_string()),
    });
}

async fn pump(
    ws: WsStream,
    rx: &mut mpsc::Receiver<Outbound>,
    inner: &Inner,
) -> Result<(), tungstenite::Error> {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    inner.emit(SessionEvent::Message(text.as_str().to_owned()));
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
