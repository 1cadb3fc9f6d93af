//! Session store.
//!
//! Owns the process-wide [`Session`]: an in-memory copy backed by durable
//! [`Storage`] under the `user` key. Every mutation persists the whole
//! session object in one write before the in-memory copy is swapped, so
//! the stored credentials are never a mix of old and new values.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use wilma_core::storage::{MemoryStorage, Storage};

use super::model::{Principal, Session};
use crate::error::ClientError;

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "user";

#[derive(Debug)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Re-hydrate the session from storage.
    ///
    /// An unreadable or half-present session is discarded and removed.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let current = match storage.get(SESSION_KEY) {
            Ok(Some(value)) => match serde_json::from_value::<Session>(value) {
                Ok(session) if session.is_complete() => {
                    debug!(user_id = session.principal.id, "Session restored");
                    Some(session)
                }
                Ok(_) => {
                    warn!("Discarding stored session with missing credentials");
                    discard(storage.as_ref());
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored session");
                    discard(storage.as_ref());
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                None
            }
        };
        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    /// Store with no persistence beyond the process.
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStorage::new()))
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.read().as_ref().map(|s| s.principal.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.refresh_token.clone())
    }

    /// Install a new session (login).
    pub fn replace(&self, session: Session) -> Result<(), ClientError> {
        if !session.is_complete() {
            return Err(ClientError::Decode(
                "session is missing an access or refresh token".into(),
            ));
        }
        let mut current = self.write();
        self.persist(&session)?;
        info!(user_id = session.principal.id, "Session stored");
        *current = Some(session);
        Ok(())
    }

    /// Replace the credentials of the current session.
    ///
    /// `refresh_token` of `None` keeps the previous refresh credential.
    pub fn update_tokens(
        &self,
        token: String,
        refresh_token: Option<String>,
    ) -> Result<Session, ClientError> {
        if token.is_empty() {
            return Err(ClientError::RefreshResponseInvalid);
        }
        let mut current = self.write();
        let updated = current
            .as_ref()
            .ok_or(ClientError::SessionExpired)?
            .with_tokens(token, refresh_token.filter(|r| !r.is_empty()));
        self.persist(&updated)?;
        debug!(user_id = updated.principal.id, "Session tokens updated");
        *current = Some(updated.clone());
        Ok(updated)
    }

    /// Apply a change to the stored principal (profile edits).
    pub fn update_principal(&self, f: impl FnOnce(&mut Principal)) -> Result<(), ClientError> {
        let mut current = self.write();
        let Some(session) = current.as_ref() else {
            return Err(ClientError::SessionExpired);
        };
        let mut updated = session.clone();
        f(&mut updated.principal);
        self.persist(&updated)?;
        *current = Some(updated);
        Ok(())
    }

    /// Destroy the session in memory and in storage.
    pub fn clear(&self) -> Result<(), ClientError> {
        let mut current = self.write();
        *current = None;
        self.storage.remove(SESSION_KEY)?;
        info!("Session cleared");
        Ok(())
    }

    fn persist(&self, session: &Session) -> Result<(), ClientError> {
        let value = serde_json::to_value(session).map_err(wilma_core::Error::from)?;
        self.storage.set(SESSION_KEY, value)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn discard(storage: &dyn Storage) {
    if let Err(e) = storage.remove(SESSION_KEY) {
        warn!(error = %e, "Failed to remove discarded session");
    }
}
