//! Contact message from a signed-in client to the studio

use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::gate::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub user_email: String,
    pub user_name: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    /// Build a message sent as `from`; subject and body are trimmed and must be non-empty
    pub fn new(from: &Identity, name: Option<&str>, subject: &str, message: &str) -> Result<Self> {
        let subject = subject.trim();
        let message = message.trim();
        if subject.is_empty() || message.is_empty() {
            return Err(GateError::Validation("Please fill in all fields".into()));
        }

        let user_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| from.display_name());

        Ok(Self {
            user_email: from.email.clone(),
            user_name: user_name.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        })
    }
}
