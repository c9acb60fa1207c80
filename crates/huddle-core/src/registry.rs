//! The single source of truth for "who is this connection".
//!
//! Records are created on connect, mutated once by the login handshake and
//! dropped on teardown. Connection flows run concurrently, so the whole map
//! sits behind one mutex; record mutation is rare enough that nothing finer
//! is needed.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::connection::{ConnectionId, ConnectionRecord, LoginState};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    records: Mutex<HashMap<ConnectionId, ConnectionRecord>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record for a newly reported connection.
    pub fn register(&self, handle: ConnectionId) -> Result<ConnectionRecord, RegistryError> {
        let mut records = self.records.lock();
        if records.contains_key(&handle) {
            return Err(RegistryError::DuplicateConnection(handle));
        }
        let record = ConnectionRecord::new(handle);
        records.insert(handle, record.clone());
        Ok(record)
    }

    pub fn get(&self, handle: ConnectionId) -> Result<ConnectionRecord, RegistryError> {
        self.records
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(RegistryError::NotFound(handle))
    }

    /// Complete the handshake for `handle`. Succeeds at most once per record.
    pub fn set_login_id(&self, handle: ConnectionId, id: &str) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyLoginId(handle));
        }
        let mut records = self.records.lock();
        let record = records
            .get_mut(&handle)
            .ok_or(RegistryError::NotFound(handle))?;
        match record.state {
            LoginState::AwaitingLogin => {
                record.state = LoginState::Authenticated(id.to_string());
                Ok(())
            }
            LoginState::Authenticated(_) => Err(RegistryError::AlreadyLoggedIn(handle)),
            LoginState::Rejected => Err(RegistryError::Rejected(handle)),
        }
    }

    /// Mark a connection that broke the handshake. Only valid before login.
    pub fn reject(&self, handle: ConnectionId) -> Result<(), RegistryError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(&handle)
            .ok_or(RegistryError::NotFound(handle))?;
        match record.state {
            LoginState::AwaitingLogin | LoginState::Rejected => {
                record.state = LoginState::Rejected;
                Ok(())
            }
            LoginState::Authenticated(_) => Err(RegistryError::AlreadyLoggedIn(handle)),
        }
    }

    /// Drop the record for `handle`. Removing an absent handle is a no-op,
    /// which is what makes racing disconnect/failure callbacks safe.
    pub fn remove(&self, handle: ConnectionId) -> Option<ConnectionRecord> {
        self.records.lock().remove(&handle)
    }

    pub fn contains(&self, handle: ConnectionId) -> bool {
        self.records.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
    #[error("connection {0} is not registered")]
    NotFound(ConnectionId),
    #[error("connection {0} is already logged in")]
    AlreadyLoggedIn(ConnectionId),
    #[error("connection {0} was rejected and cannot log in")]
    Rejected(ConnectionId),
    #[error("login id for connection {0} cannot be empty")]
    EmptyLoginId(ConnectionId),
}
