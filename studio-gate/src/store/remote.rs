//! BackendClient — HTTP implementation of every collaborator contract
//!
//! Talks to the hosted backend platform:
//!
//! ```text
//! rest/v1/user_roles          role lookup
//! rest/v1/waivers             waiver lookup, upsert, listing
//! auth/v1/{token,signup,user,logout}
//! functions/v1/verify-passcode
//! functions/v1/send-contact-email
//! functions/v1/send-signup-emails
//! ```
//!
//! Every request carries the project API key. Requests made on behalf of a
//! visitor authenticate with that visitor's access token, so the backend's
//! row-level policies apply; the rest authenticate with the API key.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::GateConfig;
use crate::contact::ContactMessage;
use crate::error::{GateError, Result};
use crate::gate::{Identity, UserRole};
use crate::waiver::{WaiverRecord, WaiverSubmission};

use super::{AuthSession, Mailer, PasscodeVerifier, RoleStore, SessionProvider, SignUpOutcome, WaiverStore};

const ROLES_PATH: &str = "rest/v1/user_roles";
const WAIVERS_PATH: &str = "rest/v1/waivers";
const PASSCODE_PATH: &str = "functions/v1/verify-passcode";
const CONTACT_PATH: &str = "functions/v1/send-contact-email";
const WELCOME_PATH: &str = "functions/v1/send-signup-emails";

// ─── Wire types ───

#[derive(Deserialize)]
struct RoleRow {
    role: String,
}

#[derive(Deserialize)]
struct UserRow {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Identity::new(row.id, row.email.unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserRow,
}

/// Sign-up answers with a session, or with the bare user when confirmation is on
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserRow),
}

#[derive(Deserialize)]
struct PasscodeResponse {
    valid: bool,
}

#[derive(Deserialize)]
struct FunctionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Data-API error body
#[derive(Deserialize)]
struct DataApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Auth-API error body; older and newer servers use different field names
#[derive(Deserialize)]
struct AuthApiError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: usize,
}

#[derive(Clone, Copy)]
enum Api {
    Data,
    Auth,
    Function,
}

// ─── Client ───

/// HTTP client for the hosted backend
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    config: GateConfig,
}

impl BackendClient {
    pub fn new(config: GateConfig) -> Result<Self> {
        // fail fast on a malformed base URL
        config.endpoint("")?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GateError::Config(format!("HTTP client: {e}")))?;

        info!(backend = %config.backend_url, "Backend client ready");
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.config.endpoint(path)
    }

    /// Attach the API key, authenticating as `bearer` (the API key by default)
    fn authorized(&self, builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer.unwrap_or(&self.config.api_key))
    }

    async fn check(api: Api, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "Backend request failed");

        Err(match api {
            Api::Data => match serde_json::from_str::<DataApiError>(&body) {
                Ok(e) => GateError::Database {
                    code: e.code,
                    message: e.message.unwrap_or_else(|| status.to_string()),
                },
                Err(_) => GateError::Database {
                    code: None,
                    message: format!("{status}: {body}"),
                },
            },
            Api::Auth => match serde_json::from_str::<AuthApiError>(&body) {
                Ok(e) => GateError::Auth {
                    message: e
                        .error_description
                        .or(e.msg)
                        .or(e.message)
                        .or(e.error.clone())
                        .unwrap_or_else(|| status.to_string()),
                    code: e.error_code.or(e.error),
                },
                Err(_) => GateError::Auth {
                    message: status.to_string(),
                    code: None,
                },
            },
            Api::Function if status.is_server_error() => {
                GateError::Network(format!("{status}: {body}"))
            }
            Api::Function => GateError::Unknown(format!("{status}: {body}")),
        })
    }

    async fn read<T: DeserializeOwned>(api: Api, resp: Response) -> Result<T> {
        Ok(Self::check(api, resp).await?.json::<T>().await?)
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        path: &str,
        select: &str,
        user_id: &str,
        access_token: Option<&str>,
    ) -> Result<Option<T>> {
        let filter = format!("eq.{user_id}");
        let resp = self
            .authorized(self.http.get(self.url(path)?), access_token)
            .query(&[("select", select), ("user_id", filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<T> = Self::read(Api::Data, resp).await?;
        Ok(rows.into_iter().next())
    }

    fn verify_locally(&self, secret: &str, access_token: &str) -> Result<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);

        let claims = decode::<AccessClaims>(
            access_token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?
        .claims;

        Ok(Identity::new(claims.sub, claims.email.unwrap_or_default()))
    }
}

#[async_trait]
impl SessionProvider for BackendClient {
    async fn resolve(&self, access_token: &str) -> Result<Identity> {
        if let Some(secret) = self.config.jwt_secret.as_deref() {
            return self.verify_locally(secret, access_token);
        }

        let resp = self
            .authorized(self.http.get(self.url("auth/v1/user")?), Some(access_token))
            .send()
            .await?;
        let user: UserRow = Self::read(Api::Auth, resp).await?;
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let resp = self
            .authorized(self.http.post(self.url("auth/v1/token")?), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::read(Api::Auth, resp).await?;
        info!(user_id = %token.user.id, "Signed in");
        Ok(AuthSession {
            access_token: token.access_token,
            user: token.user.into(),
        })
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<SignUpOutcome> {
        let resp = self
            .authorized(self.http.post(self.url("auth/v1/signup")?), None)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name.unwrap_or_default() },
            }))
            .send()
            .await?;

        match Self::read::<SignUpResponse>(Api::Auth, resp).await? {
            SignUpResponse::Session(token) => {
                info!(user_id = %token.user.id, "Signed up");
                Ok(SignUpOutcome::SignedIn(AuthSession {
                    access_token: token.access_token,
                    user: token.user.into(),
                }))
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Signed up, awaiting confirmation");
                Ok(SignUpOutcome::ConfirmationRequired(user.into()))
            }
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let resp = self
            .authorized(self.http.post(self.url("auth/v1/logout")?), Some(access_token))
            .send()
            .await?;
        Self::check(Api::Auth, resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for BackendClient {
    async fn is_admin(&self, user_id: &str, access_token: Option<&str>) -> Result<bool> {
        let row: Option<RoleRow> = self.first_row(ROLES_PATH, "role", user_id, access_token).await?;
        Ok(row.is_some_and(|r| UserRole::from_str(&r.role) == UserRole::Admin))
    }
}

#[async_trait]
impl WaiverStore for BackendClient {
    async fn has_waiver(&self, user_id: &str, access_token: Option<&str>) -> Result<bool> {
        let row: Option<serde_json::Value> =
            self.first_row(WAIVERS_PATH, "user_id", user_id, access_token).await?;
        Ok(row.is_some())
    }

    async fn get_waiver(&self, user_id: &str, access_token: Option<&str>) -> Result<Option<WaiverRecord>> {
        self.first_row(WAIVERS_PATH, "*", user_id, access_token).await
    }

    async fn upsert_waiver(
        &self,
        user_id: &str,
        access_token: Option<&str>,
        submission: WaiverSubmission,
    ) -> Result<WaiverRecord> {
        let record = submission.into_record(user_id, Utc::now());
        let resp = self
            .authorized(self.http.post(self.url(WAIVERS_PATH)?), access_token)
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[&record])
            .send()
            .await?;
        Self::check(Api::Data, resp).await?;
        info!(user_id, "Waiver saved");
        Ok(record)
    }

    async fn list_waivers(&self, access_token: Option<&str>) -> Result<Vec<WaiverRecord>> {
        let resp = self
            .authorized(self.http.get(self.url(WAIVERS_PATH)?), access_token)
            .query(&[("select", "*"), ("order", "signed_at.desc")])
            .send()
            .await?;
        Self::read(Api::Data, resp).await
    }
}

#[async_trait]
impl PasscodeVerifier for BackendClient {
    async fn verify(&self, code: &str) -> Result<bool> {
        let resp = self
            .authorized(self.http.post(self.url(PASSCODE_PATH)?), None)
            .json(&json!({ "code": code }))
            .send()
            .await?;
        let body: PasscodeResponse = Self::read(Api::Function, resp).await?;
        Ok(body.valid)
    }
}

#[async_trait]
impl Mailer for BackendClient {
    async fn send_contact(&self, message: &ContactMessage) -> Result<()> {
        let resp = self
            .authorized(self.http.post(self.url(CONTACT_PATH)?), None)
            .json(message)
            .send()
            .await?;
        let body: FunctionResponse = Self::read(Api::Function, resp).await?;
        if !body.success {
            let reason = body.error.unwrap_or_else(|| "Failed to send message".into());
            warn!(reason = %reason, "Contact message rejected");
            return Err(GateError::Mail(reason));
        }
        Ok(())
    }

    async fn send_welcome(&self, user: &Identity, name: Option<&str>) -> Result<()> {
        let resp = self
            .authorized(self.http.post(self.url(WELCOME_PATH)?), None)
            .json(&json!({
                "userEmail": user.email,
                "userName": name.unwrap_or_else(|| user.display_name()),
            }))
            .send()
            .await?;
        Self::check(Api::Function, resp).await?;
        Ok(())
    }
}
