//! In-process backend — every collaborator contract backed by concurrent maps
//!
//! Used by the test suites and by `studio-server` when no backend URL is
//! configured. Mirrors the hosted backend's observable behavior closely
//! enough for the gate: the same auth error messages, one waiver per user,
//! waivers listed newest first. Lookups can be slowed down or made to fail
//! per store to exercise the gate's fail-closed and race handling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::contact::ContactMessage;
use crate::error::{GateError, Result};
use crate::gate::{Identity, UserRole};
use crate::validate::is_valid_email;
use crate::waiver::{WaiverRecord, WaiverSubmission};

use super::{AuthSession, Mailer, PasscodeVerifier, RoleStore, SessionProvider, SignUpOutcome, WaiverStore};

struct Account {
    identity: Identity,
    password: String,
    confirmed: bool,
}

/// In-memory backend
pub struct MemoryBackend {
    passcode: String,
    require_confirmation: bool,

    accounts: DashMap<String, Account>,
    tokens: DashMap<String, Identity>,
    roles: DashMap<String, UserRole>,
    waivers: DashMap<String, WaiverRecord>,

    lookup_latency: DashMap<String, Duration>,
    fail_role_lookups: AtomicBool,
    fail_waiver_lookups: AtomicBool,
    fail_passcode: AtomicBool,

    role_lookups: AtomicUsize,
    waiver_lookups: AtomicUsize,

    contact_outbox: Mutex<Vec<ContactMessage>>,
    welcome_outbox: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self {
            passcode: passcode.into(),
            require_confirmation: false,
            accounts: DashMap::new(),
            tokens: DashMap::new(),
            roles: DashMap::new(),
            waivers: DashMap::new(),
            lookup_latency: DashMap::new(),
            fail_role_lookups: AtomicBool::new(false),
            fail_waiver_lookups: AtomicBool::new(false),
            fail_passcode: AtomicBool::new(false),
            role_lookups: AtomicUsize::new(0),
            waiver_lookups: AtomicUsize::new(0),
            contact_outbox: Mutex::new(Vec::new()),
            welcome_outbox: Mutex::new(Vec::new()),
        }
    }

    /// New sign-ups must confirm their email before signing in
    pub fn with_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    // ─── Seeding ───

    /// Create a confirmed account and return its identity
    pub fn add_user(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string(), email);
        self.accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        identity
    }

    /// Issue an access token for an existing identity
    pub fn issue_token(&self, identity: &Identity) -> String {
        let token = format!("mem-{}", Uuid::new_v4());
        self.tokens.insert(token.clone(), identity.clone());
        token
    }

    pub fn grant_admin(&self, user_id: &str) {
        self.roles.insert(user_id.to_string(), UserRole::Admin);
    }

    pub fn insert_waiver(&self, record: WaiverRecord) {
        self.waivers.insert(record.user_id.clone(), record);
    }

    // ─── Fault injection ───

    /// Delay role and waiver lookups for `user_id`
    pub fn set_lookup_latency(&self, user_id: &str, latency: Duration) {
        self.lookup_latency.insert(user_id.to_string(), latency);
    }

    pub fn fail_role_lookups(&self, fail: bool) {
        self.fail_role_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_waiver_lookups(&self, fail: bool) {
        self.fail_waiver_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_passcode(&self, fail: bool) {
        self.fail_passcode.store(fail, Ordering::SeqCst);
    }

    // ─── Inspection ───

    pub fn role_lookups(&self) -> usize {
        self.role_lookups.load(Ordering::SeqCst)
    }

    pub fn waiver_lookups(&self) -> usize {
        self.waiver_lookups.load(Ordering::SeqCst)
    }

    pub fn waiver_for(&self, user_id: &str) -> Option<WaiverRecord> {
        self.waivers.get(user_id).map(|w| w.clone())
    }

    pub fn sent_contact_messages(&self) -> Vec<ContactMessage> {
        self.contact_outbox.lock().clone()
    }

    pub fn sent_welcomes(&self) -> Vec<String> {
        self.welcome_outbox.lock().clone()
    }

    // ─── Helpers ───

    async fn simulate_latency(&self, user_id: &str) {
        let latency = self.lookup_latency.get(user_id).map(|d| *d);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn auth_error(message: &str) -> GateError {
        GateError::Auth {
            message: message.to_string(),
            code: None,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("seaside")
    }
}

#[async_trait]
impl SessionProvider for MemoryBackend {
    async fn resolve(&self, access_token: &str) -> Result<Identity> {
        self.tokens
            .get(access_token)
            .map(|id| id.clone())
            .ok_or_else(|| Self::auth_error("Invalid JWT"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let identity = {
            let account = self
                .accounts
                .get(email)
                .filter(|a| a.password == password)
                .ok_or_else(|| Self::auth_error("Invalid login credentials"))?;
            if !account.confirmed {
                return Err(Self::auth_error("Email not confirmed"));
            }
            account.identity.clone()
        };

        let access_token = self.issue_token(&identity);
        debug!(user_id = %identity.id, "Memory sign-in");
        Ok(AuthSession {
            access_token,
            user: identity,
        })
    }

    async fn sign_up(&self, email: &str, password: &str, _full_name: Option<&str>) -> Result<SignUpOutcome> {
        if !is_valid_email(email) {
            return Err(Self::auth_error("Unable to validate email address"));
        }
        if password.is_empty() {
            return Err(Self::auth_error("Signup requires a valid password"));
        }
        if password.chars().count() < 6 {
            return Err(Self::auth_error("Password should be at least 6 characters"));
        }
        let identity = match self.accounts.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(Self::auth_error("User already registered")),
            Entry::Vacant(slot) => {
                let identity = Identity::new(Uuid::new_v4().to_string(), email);
                slot.insert(Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    confirmed: !self.require_confirmation,
                });
                identity
            }
        };
        info!(user_id = %identity.id, "Memory sign-up");

        if self.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired(identity));
        }
        let access_token = self.issue_token(&identity);
        Ok(SignUpOutcome::SignedIn(AuthSession {
            access_token,
            user: identity,
        }))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.tokens.remove(access_token);
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryBackend {
    async fn is_admin(&self, user_id: &str, _access_token: Option<&str>) -> Result<bool> {
        self.role_lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency(user_id).await;
        if self.fail_role_lookups.load(Ordering::SeqCst) {
            return Err(GateError::Network("role lookup unavailable".into()));
        }
        Ok(self
            .roles
            .get(user_id)
            .is_some_and(|role| *role == UserRole::Admin))
    }
}

#[async_trait]
impl WaiverStore for MemoryBackend {
    async fn has_waiver(&self, user_id: &str, _access_token: Option<&str>) -> Result<bool> {
        self.waiver_lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency(user_id).await;
        if self.fail_waiver_lookups.load(Ordering::SeqCst) {
            return Err(GateError::Network("waiver lookup unavailable".into()));
        }
        Ok(self.waivers.contains_key(user_id))
    }

    async fn get_waiver(&self, user_id: &str, _access_token: Option<&str>) -> Result<Option<WaiverRecord>> {
        Ok(self.waiver_for(user_id))
    }

    async fn upsert_waiver(
        &self,
        user_id: &str,
        _access_token: Option<&str>,
        submission: WaiverSubmission,
    ) -> Result<WaiverRecord> {
        let record = submission.into_record(user_id, Utc::now());
        self.waivers.insert(user_id.to_string(), record.clone());
        Ok(record)
    }

    async fn list_waivers(&self, _access_token: Option<&str>) -> Result<Vec<WaiverRecord>> {
        let mut all: Vec<WaiverRecord> = self.waivers.iter().map(|w| w.value().clone()).collect();
        all.sort_by(|a, b| b.signed_at.cmp(&a.signed_at));
        Ok(all)
    }
}

#[async_trait]
impl PasscodeVerifier for MemoryBackend {
    async fn verify(&self, code: &str) -> Result<bool> {
        if self.fail_passcode.load(Ordering::SeqCst) {
            return Err(GateError::Network("passcode function unavailable".into()));
        }
        Ok(code == self.passcode)
    }
}

#[async_trait]
impl Mailer for MemoryBackend {
    async fn send_contact(&self, message: &ContactMessage) -> Result<()> {
        self.contact_outbox.lock().push(message.clone());
        Ok(())
    }

    async fn send_welcome(&self, user: &Identity, _name: Option<&str>) -> Result<()> {
        self.welcome_outbox.lock().push(user.email.clone());
        Ok(())
    }
}
