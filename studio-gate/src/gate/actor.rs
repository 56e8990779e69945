//! GateActor — Tokio actor owning one visitor's view state
//!
//! The actor is the single writer of the view. Session updates and user
//! actions arrive over an mpsc channel and are processed sequentially;
//! every change re-runs [`resolve_view`] and publishes the result on a
//! `watch` channel.
//!
//! Access flags are fetched off the actor: when the identity changes, a
//! task joins the role and waiver lookups and mails the result back,
//! tagged with the user id and a generation counter. Results whose tag
//! no longer matches the current identity are dropped. The fetch task
//! only holds a weak sender, so an unmounted gate is never kept alive.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studio_gate::gate::{GateActor, Identity, Session};
//! use studio_gate::store::{memory::MemoryBackend, Collaborators};
//! use studio_gate::GateConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(MemoryBackend::new("seaside"));
//!     let config = GateConfig::new("http://localhost:54321");
//!     let gate = GateActor::spawn(&config, Collaborators::from_backend(backend));
//!
//!     // Landing → auth
//!     gate.submit_passcode("seaside".into()).await?;
//!
//!     // Session provider reports a sign-in; flags are fetched in the background
//!     gate.set_session(Session::signed_in(Identity::new("u-1", "sol@example.com"))).await?;
//!     let view = gate.settled().await?;
//!     println!("rendering {view}");
//!
//!     gate.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::store::Collaborators;
use crate::waiver::WaiverSubmission;

use super::resolve::{resolve_view, GateInputs};
use super::types::*;

// ─── Actor Messages ───

enum GateMsg {
    SetSession {
        session: Session,
        reply: oneshot::Sender<ViewState>,
    },
    SubmitPasscode {
        code: String,
        reply: oneshot::Sender<Result<ViewState>>,
    },
    SetAuthMode {
        sign_in: bool,
        reply: oneshot::Sender<ViewState>,
    },
    SubmitWaiver {
        submission: WaiverSubmission,
        reply: oneshot::Sender<Result<ViewState>>,
    },
    WaiverCompleted {
        reply: oneshot::Sender<ViewState>,
    },
    Snapshot {
        reply: oneshot::Sender<GateSnapshot>,
    },
    FlagsResolved {
        user_id: String,
        generation: u64,
        flags: AccessFlags,
    },
    Shutdown,
}

// ─── Actor ───

/// Gate actor — resolves the view for one visitor
pub struct GateActor {
    collaborators: Collaborators,
    passcode_gate: bool,

    session: Session,
    /// `None` while no user is present or the lookups are in flight
    flags: Option<AccessFlags>,
    /// Bumped on every identity change; tags in-flight flag fetches
    generation: u64,
    /// Waiver completed while this generation's flags were still in flight
    waiver_pending: bool,
    passcode_accepted: bool,
    sign_in_requested: bool,

    rx: mpsc::Receiver<GateMsg>,
    mailbox: mpsc::WeakSender<GateMsg>,
    view_tx: watch::Sender<ViewState>,
}

impl GateActor {
    /// Mount a gate for an anonymous visitor and return its handle
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: &GateConfig, collaborators: Collaborators) -> GateHandle {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));

        let session = Session::signed_out();
        let initial = ViewState::initial(config.passcode_gate);
        let (view_tx, view_rx) = watch::channel(initial);

        let actor = Self {
            collaborators,
            passcode_gate: config.passcode_gate,
            session,
            flags: None,
            generation: 0,
            waiver_pending: false,
            passcode_accepted: false,
            sign_in_requested: false,
            rx,
            mailbox: tx.downgrade(),
            view_tx,
        };

        tokio::spawn(actor.run());
        debug!(view = %initial, "GateActor spawned");
        GateHandle { tx, view_rx }
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                GateMsg::SetSession { session, reply } => {
                    let _ = reply.send(self.handle_set_session(session));
                }
                GateMsg::SubmitPasscode { code, reply } => {
                    let _ = reply.send(self.handle_passcode(&code).await);
                }
                GateMsg::SetAuthMode { sign_in, reply } => {
                    self.sign_in_requested = sign_in;
                    let _ = reply.send(self.publish());
                }
                GateMsg::SubmitWaiver { submission, reply } => {
                    let _ = reply.send(self.handle_submit_waiver(submission).await);
                }
                GateMsg::WaiverCompleted { reply } => {
                    let _ = reply.send(self.mark_waiver_complete());
                }
                GateMsg::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                GateMsg::FlagsResolved { user_id, generation, flags } => {
                    self.handle_flags_resolved(user_id, generation, flags);
                }
                GateMsg::Shutdown => break,
            }
        }
        debug!("GateActor stopped");
    }

    // ─── Handler Implementations ───

    fn handle_set_session(&mut self, session: Session) -> ViewState {
        let previous = self.session.user_id().map(str::to_owned);
        let identity_changed = previous.as_deref() != session.user_id();
        let signed_out = previous.is_some() && session.user.is_none();

        self.session = session;

        if identity_changed {
            self.generation += 1;
            self.flags = None;
            self.waiver_pending = false;

            if signed_out {
                self.passcode_accepted = false;
                self.sign_in_requested = false;
                info!(user_id = previous.as_deref().unwrap_or_default(), "Signed out, gate reset");
            }

            if let Some(user) = self.session.user.clone() {
                self.spawn_flag_fetch(user, self.session.access_token.clone(), self.generation);
            }
        }

        self.publish()
    }

    /// Join the role and waiver lookups off-actor and mail the tagged result back
    fn spawn_flag_fetch(&self, user: Identity, access_token: Option<String>, generation: u64) {
        let roles = Arc::clone(&self.collaborators.roles);
        let waivers = Arc::clone(&self.collaborators.waivers);
        let mailbox = self.mailbox.clone();

        debug!(user_id = %user.id, generation, "Fetching access flags");
        tokio::spawn(async move {
            let token = access_token.as_deref();
            let (is_admin, has_waiver) = tokio::join!(
                roles.is_admin(&user.id, token),
                waivers.has_waiver(&user.id, token)
            );

            let flags = AccessFlags {
                is_admin: fail_closed("role", &user.id, is_admin),
                has_waiver: fail_closed("waiver", &user.id, has_waiver),
            };

            if let Some(tx) = mailbox.upgrade() {
                let _ = tx
                    .send(GateMsg::FlagsResolved {
                        user_id: user.id,
                        generation,
                        flags,
                    })
                    .await;
            }
        });
    }

    fn handle_flags_resolved(&mut self, user_id: String, generation: u64, mut flags: AccessFlags) {
        if generation != self.generation || self.session.user_id() != Some(user_id.as_str()) {
            debug!(
                user_id = %user_id,
                generation,
                current = self.generation,
                "Discarding stale access flags"
            );
            return;
        }

        flags.has_waiver |= self.waiver_pending;
        debug!(user_id = %user_id, is_admin = flags.is_admin, has_waiver = flags.has_waiver, "Access flags resolved");
        self.flags = Some(flags);
        self.publish();
    }

    async fn handle_passcode(&mut self, code: &str) -> Result<ViewState> {
        if !self.passcode_gate || self.passcode_accepted {
            return Ok(self.publish());
        }
        if code.trim().is_empty() {
            return Err(GateError::InvalidPasscode);
        }

        match self.collaborators.passcode.verify(code).await {
            Ok(true) => {
                self.passcode_accepted = true;
                info!("Passcode accepted");
                Ok(self.publish())
            }
            Ok(false) => {
                info!("Passcode rejected");
                Err(GateError::InvalidPasscode)
            }
            Err(e) => {
                warn!(error = ?e, "Passcode check failed");
                Err(GateError::PasscodeUnavailable(e.to_string()))
            }
        }
    }

    async fn handle_submit_waiver(&mut self, submission: WaiverSubmission) -> Result<ViewState> {
        let user = self.session.user.clone().ok_or(GateError::NotSignedIn)?;
        submission.validate()?;

        let token = self.session.access_token.as_deref();
        if let Err(e) = self.collaborators.waivers.upsert_waiver(&user.id, token, submission).await {
            warn!(user_id = %user.id, error = ?e, "Waiver submit failed");
            return Err(e);
        }

        Ok(self.mark_waiver_complete())
    }

    /// Optimistic local transition: the waiver store is not queried again.
    /// Before the flags arrive the completion is held for this identity.
    fn mark_waiver_complete(&mut self) -> ViewState {
        match self.flags.as_mut() {
            Some(flags) => flags.has_waiver = true,
            None if self.session.user.is_some() => {
                debug!("Waiver completed before access flags resolved, holding it");
                self.waiver_pending = true;
            }
            None => warn!("Waiver completed without a signed-in user"),
        }
        self.publish()
    }

    // ─── Helpers ───

    fn inputs(&self) -> GateInputs {
        GateInputs {
            session_loading: self.session.loading,
            signed_in: self.session.user.is_some(),
            flags: self.flags,
            passcode_gate: self.passcode_gate,
            passcode_accepted: self.passcode_accepted,
            sign_in_requested: self.sign_in_requested,
        }
    }

    /// Re-derive the view and notify watchers if it moved
    fn publish(&self) -> ViewState {
        let view = resolve_view(&self.inputs());
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            debug!(from = %current, to = %view, "View changed");
            *current = view;
            true
        });
        view
    }

    fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            view: *self.view_tx.borrow(),
            user: self.session.user.clone(),
            flags: self.flags,
            passcode_accepted: !self.passcode_gate || self.passcode_accepted,
        }
    }
}

/// A failed lookup counts as `false`
fn fail_closed(lookup: &str, user_id: &str, result: Result<bool>) -> bool {
    result.unwrap_or_else(|e| {
        warn!(lookup, user_id, error = ?e, "Access flag lookup failed, treating as false");
        false
    })
}

// ─── Handle (client-facing API) ───

/// Cloneable handle to a running GateActor
#[derive(Clone)]
pub struct GateHandle {
    tx: mpsc::Sender<GateMsg>,
    view_rx: watch::Receiver<ViewState>,
}

impl GateHandle {
    async fn request<T>(&self, msg: impl FnOnce(oneshot::Sender<T>) -> GateMsg) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(msg(reply))
            .await
            .map_err(|_| GateError::ActorUnavailable("GateActor".into()))?;
        rx.await
            .map_err(|_| GateError::ActorUnavailable("GateActor dropped".into()))
    }

    /// Apply a session provider update
    pub async fn set_session(&self, session: Session) -> Result<ViewState> {
        self.request(|reply| GateMsg::SetSession { session, reply }).await
    }

    pub async fn submit_passcode(&self, code: String) -> Result<ViewState> {
        self.request(|reply| GateMsg::SubmitPasscode { code, reply }).await?
    }

    /// Show the sign-in form (leaves the landing page without a passcode)
    pub async fn request_sign_in(&self) -> Result<ViewState> {
        self.request(|reply| GateMsg::SetAuthMode { sign_in: true, reply }).await
    }

    pub async fn request_sign_up(&self) -> Result<ViewState> {
        self.request(|reply| GateMsg::SetAuthMode { sign_in: false, reply }).await
    }

    /// Persist the waiver for the signed-in user, then move on to the dashboard
    pub async fn submit_waiver(&self, submission: WaiverSubmission) -> Result<ViewState> {
        self.request(|reply| GateMsg::SubmitWaiver { submission, reply }).await?
    }

    /// The caller already persisted the waiver
    pub async fn waiver_completed(&self) -> Result<ViewState> {
        self.request(|reply| GateMsg::WaiverCompleted { reply }).await
    }

    pub async fn snapshot(&self) -> Result<GateSnapshot> {
        self.request(|reply| GateMsg::Snapshot { reply }).await
    }

    /// Last published view
    pub fn view(&self) -> ViewState {
        *self.view_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_rx.clone()
    }

    /// Wait until the gate leaves the loading state
    pub async fn settled(&self) -> Result<ViewState> {
        let mut rx = self.view_rx.clone();
        let view = rx
            .wait_for(|view| !view.is_loading())
            .await
            .map_err(|_| GateError::ActorUnavailable("GateActor stopped".into()))?;
        Ok(*view)
    }

    /// Unmount the gate. Pending flag fetches are abandoned.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(GateMsg::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
