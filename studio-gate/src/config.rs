//! Configuration for the studio access gate

use std::time::Duration;

use url::Url;

use crate::error::{GateError, Result};

/// Gate configuration
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Base URL of the backend platform (data API, auth API, edge functions)
    pub backend_url: String,

    /// API key sent as `apikey` and as the default bearer token
    pub api_key: String,

    /// JWT secret for verifying access tokens locally.
    /// When absent, tokens are resolved through the auth API.
    pub jwt_secret: Option<String>,

    /// Whether anonymous visitors must enter a passcode before reaching auth
    pub passcode_gate: bool,

    /// Timeout applied to every backend request
    pub request_timeout: Duration,

    /// Gate actor mailbox size
    pub mailbox_capacity: usize,
}

impl GateConfig {
    /// Create config with sensible defaults
    ///
    /// The API key and JWT secret are picked up from `STUDIO_API_KEY`
    /// and `STUDIO_JWT_SECRET` when set.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            api_key: std::env::var("STUDIO_API_KEY").unwrap_or_default(),
            jwt_secret: std::env::var("STUDIO_JWT_SECRET").ok(),
            passcode_gate: true,
            request_timeout: Duration::from_secs(10),
            mailbox_capacity: 64,
        }
    }

    /// Load from the environment; `STUDIO_BACKEND_URL` is required
    pub fn from_env() -> Result<Self> {
        let backend_url = std::env::var("STUDIO_BACKEND_URL")
            .map_err(|_| GateError::Config("STUDIO_BACKEND_URL is not set".into()))?;

        Self::new(backend_url).with_env_overrides()
    }

    /// Apply `STUDIO_PASSCODE_GATE` when set
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var("STUDIO_PASSCODE_GATE") {
            self.passcode_gate = parse_flag(&raw)
                .ok_or_else(|| GateError::Config(format!("STUDIO_PASSCODE_GATE: invalid value {raw:?}")))?;
        }
        Ok(self)
    }

    /// Override API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Override JWT secret
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Resolve tokens through the auth API even if a secret is in the environment
    pub fn without_jwt_secret(mut self) -> Self {
        self.jwt_secret = None;
        self
    }

    /// Enable or disable the passcode landing page
    pub fn with_passcode_gate(mut self, enabled: bool) -> Self {
        self.passcode_gate = enabled;
        self
    }

    /// Override request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve a backend path such as `rest/v1/waivers` against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.backend_url)?;
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
