//! # Studio Server
//!
//! JSON API in front of the access gate. Each browser session gets its own
//! gate actor; the client drives it (passcode, sign-in, waiver) and renders
//! whatever `view` the API reports back.
//!
//! ```text
//! client ──HTTP──▶ routes ──▶ SessionRegistry ──▶ GateHandle ──▶ GateActor
//!                    │                                              │
//!                    └──▶ SessionProvider / Mailer / WaiverStore ◀──┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use studio_gate::store::{Collaborators, Mailer, PasscodeVerifier, RoleStore, SessionProvider, WaiverStore};
use studio_gate::{BackendClient, GateConfig, MemoryBackend};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use sessions::{ClientSession, SessionRegistry, SessionView};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gate_config: GateConfig,
    pub collaborators: Collaborators,
    pub auth: Arc<dyn SessionProvider>,
    pub waivers: Arc<dyn WaiverStore>,
    pub mailer: Arc<dyn Mailer>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Serve every collaborator from one backend
    pub fn from_backend<B>(gate_config: GateConfig, backend: Arc<B>, sessions: Arc<SessionRegistry>) -> Self
    where
        B: SessionProvider + RoleStore + WaiverStore + PasscodeVerifier + Mailer + 'static,
    {
        Self {
            gate_config,
            collaborators: Collaborators::from_backend(backend.clone()),
            auth: backend.clone(),
            waivers: backend.clone(),
            mailer: backend,
            sessions,
        }
    }

    pub fn from_config(config: &ServerConfig) -> studio_gate::Result<Self> {
        let sessions = Arc::new(SessionRegistry::new(config.session_ttl));

        if config.remote {
            let backend = Arc::new(BackendClient::new(config.gate.clone())?);
            info!(backend = %config.gate.backend_url, "Using hosted backend");
            return Ok(Self::from_backend(config.gate.clone(), backend, sessions));
        }

        warn!("STUDIO_BACKEND_URL not set, running on the in-memory backend");
        let backend = Arc::new(MemoryBackend::new(config.demo_passcode.clone()));
        Ok(Self::from_backend(config.gate.clone(), backend, sessions))
    }
}

pub fn router(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
