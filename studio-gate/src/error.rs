//! Error types for studio-gate — Railway Programming
//!
//! All operations return `Result<T, GateError>`.
//! No panics, no unwraps in production code paths.
//!
//! Every variant belongs to one [`ErrorCategory`] and carries a fixed
//! user-facing message ([`GateError::user_message`]) that the UI shows
//! inline. Technical detail stays in `Display` for logs.

use thiserror::Error;

/// Coarse error taxonomy shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Database,
    Validation,
    Forbidden,
    Unknown,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::Database => "DATABASE_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Unified error type for all gate operations
#[derive(Error, Debug)]
pub enum GateError {
    // ─── Transport Errors ───

    #[error("Network error: {0}")]
    Network(String),

    // ─── Backend Errors ───

    #[error("Auth error: {message}")]
    Auth { message: String, code: Option<String> },

    #[error("Database error ({}): {message}", code.as_deref().unwrap_or("?"))]
    Database { code: Option<String>, message: String },

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    // ─── User Action Errors ───

    #[error("Invalid passcode")]
    InvalidPasscode,

    #[error("Passcode verifier unavailable: {0}")]
    PasscodeUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Forbidden: requires {0}")]
    Forbidden(String),

    // ─── Infrastructure Errors ───

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::PasscodeUnavailable(_) => ErrorCategory::Network,
            Self::Auth { .. } | Self::NotSignedIn => ErrorCategory::Auth,
            Self::Database { .. } => ErrorCategory::Database,
            Self::InvalidPasscode | Self::Validation(_) => ErrorCategory::Validation,
            Self::Forbidden(_) => ErrorCategory::Forbidden,
            Self::Mail(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::ActorUnavailable(_)
            | Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// Message safe to show the visitor
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Unable to connect to the server. Please check your internet connection and try again."
                    .into()
            }
            Self::Auth { message, .. } => auth_user_message(message).into(),
            Self::Database { code, .. } => database_user_message(code.as_deref()).into(),
            Self::InvalidPasscode => "Invalid passcode. Please try again.".into(),
            Self::PasscodeUnavailable(_) => "Unable to verify passcode. Please try again.".into(),
            Self::Validation(msg) => msg.clone(),
            Self::NotSignedIn => "Please sign in to continue.".into(),
            Self::Forbidden(_) => "You do not have permission to perform this action.".into(),
            Self::Mail(_) | Self::Serialization(_) | Self::Config(_) | Self::ActorUnavailable(_) => {
                "An unexpected error occurred. Please try again.".into()
            }
            Self::Unknown(_) => "Something went wrong. Please try again later.".into(),
        }
    }
}

/// Map a backend auth message to the text shown in the auth form
pub fn auth_user_message(message: &str) -> &'static str {
    match message {
        "Invalid login credentials" => {
            "The email or password you entered is incorrect. Please try again."
        }
        "Email not confirmed" => {
            "Please check your email and confirm your account before signing in."
        }
        "User already registered" => {
            "An account with this email already exists. Please sign in instead."
        }
        "Password should be at least 6 characters" => {
            "Your password must be at least 6 characters long."
        }
        "Signup requires a valid password" => {
            "Please enter a valid password (at least 6 characters)."
        }
        "Unable to validate email address" => "Please enter a valid email address.",
        "Email rate limit exceeded" => {
            "Too many attempts. Please wait a few minutes before trying again."
        }
        "Invalid email or password" => "The email or password you entered is incorrect.",
        _ => "Authentication failed. Please try again.",
    }
}

/// Map a data-API error code (Postgres SQLSTATE) to a user-facing message
pub fn database_user_message(code: Option<&str>) -> &'static str {
    match code {
        Some("23505") => "This record already exists in the database.",
        Some("23503") => "Cannot complete this action due to related data.",
        Some("23502") => "Required information is missing. Please fill in all required fields.",
        Some("42501") => "You do not have permission to perform this action.",
        _ => "A database error occurred. Please try again.",
    }
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GateError::Serialization(err.to_string())
        } else {
            GateError::Network(err.to_string())
        }
    }
}

#[cfg(feature = "remote")]
impl From<jsonwebtoken::errors::Error> for GateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        GateError::Auth {
            message: err.to_string(),
            code: Some("invalid_token".into()),
        }
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for GateError {
    fn from(err: url::ParseError) -> Self {
        GateError::Config(format!("URL parse error: {err}"))
    }
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, GateError>;
