//! Fan-out of text to every registered connection.

use crate::transport::ServerTransport;

/// Send `text` to every connection through the transport's send-to-all
/// primitive, which isolates per-connection failures.
pub fn broadcast<T: ServerTransport + ?Sized>(transport: &T, text: &str) {
    tracing::debug!("broadcast: {}", text);
    transport.send_to_all(text);
}

/// `"<id>> <message>"`
pub fn chat_line(login_id: &str, message: &str) -> String {
    format!("{login_id}> {message}")
}

pub fn logon_notice(login_id: &str) -> String {
    format!("{login_id} has logged on")
}

pub fn server_notice(message: &str) -> String {
    format!("SERVER MSG> {message}")
}
