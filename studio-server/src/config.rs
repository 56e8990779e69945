//! Server configuration, read from the environment

use std::time::Duration;

use studio_gate::{GateConfig, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DEMO_PASSCODE: &str = "seaside";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,

    /// Gate settings; `backend_url` is only used when `remote` is set
    pub gate: GateConfig,

    /// Talk to the hosted backend rather than the in-memory one
    pub remote: bool,

    /// Passcode accepted by the in-memory backend
    pub demo_passcode: String,

    /// Idle time after which a client session is dropped
    pub session_ttl: Duration,
}

impl ServerConfig {
    /// Port from `FUNCTIONS_CUSTOMHANDLER_PORT`, then `PORT`. Without
    /// `STUDIO_BACKEND_URL` the server runs on the in-memory backend.
    pub fn from_env() -> Result<Self> {
        let port = env_parse("FUNCTIONS_CUSTOMHANDLER_PORT")
            .or_else(|| env_parse("PORT"))
            .unwrap_or(DEFAULT_PORT);

        let remote = std::env::var("STUDIO_BACKEND_URL").is_ok();
        let gate = if remote {
            GateConfig::from_env()?
        } else {
            GateConfig::new("memory://local").with_env_overrides()?
        };

        let session_ttl = env_parse("STUDIO_SESSION_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);

        Ok(Self {
            port,
            gate,
            remote,
            demo_passcode: std::env::var("STUDIO_DEMO_PASSCODE")
                .unwrap_or_else(|_| DEFAULT_DEMO_PASSCODE.to_string()),
            session_ttl,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig {
            port: 7071,
            gate: GateConfig::new("memory://local"),
            remote: false,
            demo_passcode: DEFAULT_DEMO_PASSCODE.into(),
            session_ttl: DEFAULT_SESSION_TTL,
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:7071");
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        assert_eq!(env_parse::<u16>("STUDIO_SERVER_TEST_UNSET_VARIABLE"), None);
    }
}
