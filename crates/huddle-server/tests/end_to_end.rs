//! Server and clients talking over real WebSockets on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_client::WsClientTransport;
use huddle_core::{
    ChatClient, ChatServer, Console, Flow, REJECTION_NOTICE, ServerTransport, SessionEvent,
};
use huddle_server::WsServerTransport;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Transcript(Mutex<Vec<String>>);

impl Transcript {
    fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn contains(&self, line: &str) -> bool {
        self.0.lock().iter().any(|l| l == line)
    }
}

impl Console for Transcript {
    fn display(&self, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

/// Start a server on an ephemeral port with its dispatch loop running.
fn start_server() -> u16 {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let server = Arc::new(ChatServer::new(
        WsServerTransport::new(0, events_tx),
        Transcript::default(),
    ));
    server.start().unwrap();
    let port = server.transport().port();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let _ = server.handle_event(event);
        }
    });
    port
}

struct TestClient {
    client: ChatClient<WsClientTransport, Arc<Transcript>>,
    transcript: Arc<Transcript>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl TestClient {
    fn connect(login_id: &str, port: u16) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let transcript = Arc::new(Transcript::default());
        let client = ChatClient::new(
            login_id,
            WsClientTransport::new("127.0.0.1", port, events_tx),
            transcript.clone(),
        );
        client.connect().unwrap();
        Self {
            client,
            transcript,
            events,
        }
    }

    /// Feed transport events into the client until `line` has been shown.
    async fn wait_for(&mut self, line: &str) {
        while !self.transcript.contains(line) {
            let event = timeout(TIMEOUT, self.events.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {line:?}"))
                .expect("event channel closed");
            assert_eq!(self.client.handle_event(event), Flow::Continue);
        }
    }
}

#[tokio::test]
async fn chat_reaches_every_client() {
    let port = start_server();

    let mut alice = TestClient::connect("alice", port);
    alice.wait_for("alice has logged on").await;
    assert_eq!(
        alice.transcript.lines()[0],
        "Connection to server established"
    );

    let mut bob = TestClient::connect("bob", port);
    bob.wait_for("bob has logged on").await;

    assert_eq!(alice.client.handle_line("hello"), Flow::Continue);
    alice.wait_for("alice> hello").await;
    bob.wait_for("alice> hello").await;
}

#[tokio::test]
async fn logoff_closes_without_terminating() {
    let port = start_server();

    let mut carol = TestClient::connect("carol", port);
    carol.wait_for("carol has logged on").await;

    assert_eq!(carol.client.handle_line("#logoff"), Flow::Continue);
    carol.wait_for("Connection to server closed").await;

    carol.client.handle_line("#logoff");
    assert_eq!(
        carol.transcript.lines().last().map(String::as_str),
        Some("Client is already logged off (disconnected from server)")
    );
}

#[tokio::test]
async fn first_message_must_be_login() {
    let port = start_server();

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .unwrap();
    ws.send(Message::text("hello")).await.unwrap();

    let reply = timeout(TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for rejection")
        .expect("stream closed")
        .expect("ws error");
    assert_eq!(reply, Message::text(REJECTION_NOTICE));

    loop {
        match timeout(TIMEOUT, ws.next()).await.expect("connection left open") {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(other)) => panic!("unexpected frame after rejection: {other:?}"),
        }
    }
}
