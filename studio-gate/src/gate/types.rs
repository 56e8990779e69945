//! Gate domain types — Identity, Session, AccessFlags, ViewState
//!
//! Serializable, cloneable, and cheap to pass around.

use serde::{Deserialize, Serialize};

/// An authenticated visitor's session principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Name used when no profile name is known: the email's local part
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Session as reported by the session provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<Identity>,
    pub loading: bool,
    /// Backend access token; data lookups run as this user when present
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Provider is still resolving (e.g. exchanging a token)
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn signed_in(user: Identity) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    /// Signed in with the token the provider issued
    pub fn authenticated(user: Identity, access_token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            loading: false,
            access_token: Some(access_token.into()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Per-identity access flags, fetched from the role and waiver stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFlags {
    pub is_admin: bool,
    pub has_waiver: bool,
}

/// Role stored in the role table. Anything other than `admin` is a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Member,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single top-level screen the application renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewState {
    #[serde(rename = "loading")]
    Loading,
    #[serde(rename = "landing")]
    Landing,
    #[serde(rename = "auth")]
    Auth,
    #[serde(rename = "auth-signin")]
    AuthSignIn,
    #[serde(rename = "waiver")]
    Waiver,
    #[serde(rename = "dashboard")]
    Dashboard,
    #[serde(rename = "admin")]
    Admin,
}

impl ViewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Landing => "landing",
            Self::Auth => "auth",
            Self::AuthSignIn => "auth-signin",
            Self::Waiver => "waiver",
            Self::Dashboard => "dashboard",
            Self::Admin => "admin",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// View for a visitor with no session and nothing accepted yet
    pub fn initial(passcode_gate: bool) -> Self {
        if passcode_gate {
            Self::Landing
        } else {
            Self::Auth
        }
    }
}

impl std::fmt::Display for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a gate, for callers that render more than the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub view: ViewState,
    pub user: Option<Identity>,
    pub flags: Option<AccessFlags>,
    /// Passcode entered, or no passcode gate configured
    pub passcode_accepted: bool,
}
