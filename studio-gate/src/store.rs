//! Collaborator contracts — session provider, role store, waiver store,
//! passcode verifier, mailer
//!
//! The gate only ever talks to these traits. Two implementations ship with
//! the crate:
//!
//! - [`remote::BackendClient`]: HTTP client for the hosted backend platform
//!   (data API, auth API, edge functions), behind the `remote` feature
//! - [`memory::MemoryBackend`]: in-process backend for tests and local demos
//!
//! All methods return `Result<T, GateError>`; the gate decides which
//! failures fail closed and which surface to the visitor.
//!
//! Data methods take the visitor's access token so row-level policies on
//! the backend apply to them; `None` falls back to the project API key.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::contact::ContactMessage;
use crate::error::Result;
use crate::gate::Identity;
use crate::waiver::{WaiverRecord, WaiverSubmission};

pub mod memory;
#[cfg(feature = "remote")]
pub mod remote;

/// Backend session returned by a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: Identity,
}

/// Outcome of a sign-up: a live session, or an account awaiting email confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(Identity),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve an access token to the identity it was issued for
    async fn resolve(&self, access_token: &str) -> Result<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<SignUpOutcome>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn is_admin(&self, user_id: &str, access_token: Option<&str>) -> Result<bool>;
}

#[async_trait]
pub trait WaiverStore: Send + Sync {
    async fn has_waiver(&self, user_id: &str, access_token: Option<&str>) -> Result<bool>;

    /// The stored waiver for `user_id`, to pre-fill an edit
    async fn get_waiver(&self, user_id: &str, access_token: Option<&str>) -> Result<Option<WaiverRecord>>;

    /// Insert or replace the waiver for `user_id`
    async fn upsert_waiver(
        &self,
        user_id: &str,
        access_token: Option<&str>,
        submission: WaiverSubmission,
    ) -> Result<WaiverRecord>;

    /// All waivers, newest first
    async fn list_waivers(&self, access_token: Option<&str>) -> Result<Vec<WaiverRecord>>;
}

#[async_trait]
pub trait PasscodeVerifier: Send + Sync {
    async fn verify(&self, code: &str) -> Result<bool>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_contact(&self, message: &ContactMessage) -> Result<()>;

    /// Welcome notification after sign-up
    async fn send_welcome(&self, user: &Identity, name: Option<&str>) -> Result<()>;
}

/// The collaborators a gate needs, shared across gates
#[derive(Clone)]
pub struct Collaborators {
    pub roles: Arc<dyn RoleStore>,
    pub waivers: Arc<dyn WaiverStore>,
    pub passcode: Arc<dyn PasscodeVerifier>,
}

impl Collaborators {
    /// Use one backend for every role
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RoleStore + WaiverStore + PasscodeVerifier + 'static,
    {
        Self {
            roles: backend.clone(),
            waivers: backend.clone(),
            passcode: backend,
        }
    }
}
