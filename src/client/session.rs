//! In-memory session store

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use uuid::Uuid;

use super::SessionClient;
use crate::core::error::{GatewayResult, ServerError};
use crate::core::session::{PreSession, Session};

/// Session store keyed by session id
#[derive(Debug, Default)]
pub struct MemorySessionClient {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired sessions, returning how many were removed
    pub fn purge_expired(&self) -> GatewayResult<usize> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;

        let now = Utc::now();
        let len_before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(len_before - sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_sync(&self, id: &str) -> GatewayResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| lock_poisoned())?;
        Ok(sessions.get(id).cloned())
    }

    fn create_sync(&self, pre_session: PreSession) -> GatewayResult<Session> {
        let session = Session::from_pre_session(Uuid::new_v4().to_string(), pre_session);

        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn delete_sync(&self, id: &str) -> GatewayResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        Ok(sessions.remove(id).is_some())
    }
}

impl SessionClient for MemorySessionClient {
    fn get(&self, id: String) -> BoxFuture<'_, GatewayResult<Option<Session>>> {
        future::ready(self.get_sync(&id)).boxed()
    }

    fn create(&self, pre_session: PreSession) -> BoxFuture<'_, GatewayResult<Session>> {
        future::ready(self.create_sync(pre_session)).boxed()
    }

    fn delete(&self, id: String) -> BoxFuture<'_, GatewayResult<bool>> {
        future::ready(self.delete_sync(&id)).boxed()
    }
}

fn lock_poisoned() -> ServerError {
    ServerError::internal("Lock poisoned")
}
