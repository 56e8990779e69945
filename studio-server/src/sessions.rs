//! Client session registry — one gate per browser session
//!
//! Sessions are keyed by a random id handed to the client on creation.
//! Idle sessions expire; dropping a session drops its gate handle, which
//! stops the gate's actor.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use studio_gate::gate::{GateActor, GateHandle, GateSnapshot, ViewState};
use studio_gate::store::Collaborators;
use studio_gate::GateConfig;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub struct ClientSession {
    pub id: Uuid,
    pub gate: GateHandle,
    /// Backend access token of the signed-in user
    access_token: Mutex<Option<String>>,
    last_accessed: Mutex<Instant>,
}

impl ClientSession {
    fn new(gate: GateHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            gate,
            access_token: Mutex::new(None),
            last_accessed: Mutex::new(Instant::now()),
        }
    }

    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock() = token;
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().clone()
    }

    pub fn take_access_token(&self) -> Option<String> {
        self.access_token.lock().take()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_accessed.lock().elapsed() > ttl
    }

    fn touch(&self) {
        *self.last_accessed.lock() = Instant::now();
    }

    /// Current gate state as sent to the client
    pub async fn view(&self) -> ApiResult<SessionView> {
        let snapshot = self.gate.snapshot().await?;
        Ok(SessionView::new(self.id, snapshot))
    }
}

/// Session state returned by every session endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub view: ViewState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_waiver: Option<bool>,
    pub passcode_accepted: bool,
}

impl SessionView {
    pub fn new(session_id: Uuid, snapshot: GateSnapshot) -> Self {
        Self {
            session_id,
            view: snapshot.view,
            email: snapshot.user.map(|u| u.email),
            is_admin: snapshot.flags.map(|f| f.is_admin),
            has_waiver: snapshot.flags.map(|f| f.has_waiver),
            passcode_accepted: snapshot.passcode_accepted,
        }
    }
}

pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<ClientSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Mount a gate for a new anonymous visitor
    pub fn create(&self, config: &GateConfig, collaborators: Collaborators) -> Arc<ClientSession> {
        let session = Arc::new(ClientSession::new(GateActor::spawn(config, collaborators)));
        self.sessions.insert(session.id, Arc::clone(&session));
        info!(session_id = %session.id, "Client session created");
        session
    }

    pub fn get(&self, id: Uuid) -> ApiResult<Arc<ClientSession>> {
        let session = self
            .sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ApiError::SessionNotFound)?;

        if session.is_expired(self.ttl) {
            self.sessions.remove(&id);
            debug!(session_id = %id, "Client session expired");
            return Err(ApiError::SessionNotFound);
        }

        session.touch();
        Ok(session)
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<ClientSession>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Drop idle sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(self.ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, "Expired client sessions dropped");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Periodically drop idle sessions until the registry itself is dropped
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match registry.upgrade() {
                    Some(registry) => {
                        registry.cleanup_expired();
                    }
                    None => break,
                }
            }
        })
    }
}
