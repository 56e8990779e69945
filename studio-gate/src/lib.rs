//! # Studio Gate
//!
//! Access gate for the studio site: decides which single view a visitor
//! sees (passcode landing, auth, waiver, dashboard, admin) from their
//! session and two access flags fetched from the hosted backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 studio-gate                   │
//! ├───────────────────────────────────────────────┤
//! │  GateActor (one per visitor)                  │
//! │   session ─┐                                  │
//! │   passcode ├─▶ resolve_view ─▶ watch<View>    │
//! │   flags ───┘        ▲                         │
//! │                     │ tagged (user, generation)│
//! │          join(is_admin, has_waiver)           │
//! ├───────────────────────────────────────────────┤
//! │  Collaborators (traits)                       │
//! │   SessionProvider  RoleStore  WaiverStore     │
//! │   PasscodeVerifier Mailer                     │
//! ├──────────────────────┬────────────────────────┤
//! │  BackendClient       │  MemoryBackend         │
//! │  (reqwest, remote)   │  (tests, demo mode)    │
//! └──────────────────────┴────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studio_gate::{BackendClient, Collaborators, GateActor, GateConfig, Session};
//! use studio_gate::store::SessionProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GateConfig::from_env()?;
//!     let backend = Arc::new(BackendClient::new(config.clone())?);
//!     let gate = GateActor::spawn(&config, Collaborators::from_backend(backend.clone()));
//!
//!     let auth = backend.sign_in("client@example.com", "Tide!pool9").await?;
//!     gate.set_session(Session::signed_in(auth.user)).await?;
//!     println!("view: {}", gate.settled().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Single writer**: the view is owned by its actor and only changes there
//! - **Concurrent lookups**: role and waiver checks are joined, not chained
//! - **Fail closed**: a failed lookup is `false`, never an error screen
//! - **Stale-result safe**: lookups for a superseded identity are dropped
//! - **Railway Programming**: All operations return `Result<T, GateError>`

pub mod config;
pub mod contact;
pub mod error;
pub mod gate;
pub mod store;
pub mod validate;
pub mod waiver;

// Re-exports for convenience
pub use config::GateConfig;
pub use error::{ErrorCategory, GateError, Result};
pub use gate::{AccessFlags, GateActor, GateHandle, GateSnapshot, Identity, Session, ViewState};
pub use store::memory::MemoryBackend;
pub use store::{AuthSession, Collaborators, SignUpOutcome};

#[cfg(feature = "remote")]
pub use store::remote::BackendClient;
