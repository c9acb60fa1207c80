//! Client half of Huddle: the WebSocket transport a [`huddle_core::ChatClient`]
//! talks through.

mod transport;

use huddle_core::{ChatClient, ClientTransport, Console, Flow, SessionEvent, TransportError};
use tokio::sync::mpsc;

pub use transport::WsClientTransport;

/// Open the first connection and wait for it to come up.
///
/// A failed first attempt is returned as [`TransportError::ConnectFailed`]
/// instead of going through the session's shutdown path, so the caller can
/// report it as a startup error. Anything else is handed to the client.
pub async fn establish<T, C>(
    client: &ChatClient<T, C>,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<Flow, TransportError>
where
    T: ClientTransport,
    C: Console,
{
    client.connect()?;
    match events.recv().await {
        Some(SessionEvent::Failed(cause)) => Err(TransportError::ConnectFailed(cause)),
        Some(event) => Ok(client.handle_event(event)),
        None => Err(TransportError::NotConnected),
    }
}
