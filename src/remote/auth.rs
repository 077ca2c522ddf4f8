//! Cloud credentials
//!
//! The OAuth session lives in `session.json`. A cached access token is used
//! while it is valid; otherwise the refresh token is exchanged silently.
//! Interactive sign-in is an authorization-code exchange driven through a
//! [`SignInPrompt`] supplied by the host.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::classify_status;
use crate::config::settings::RemoteSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::host::SignInPrompt;
use crate::storage::{read_json_optional, remove_if_exists, write_json_atomic};

/// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether the access token can still be used at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Resolves access tokens for the remote store
#[derive(Debug, Clone)]
pub struct Authenticator {
    http: Client,
    settings: RemoteSettings,
    session_file: PathBuf,
}

impl Authenticator {
    pub fn new(http: Client, settings: RemoteSettings, session_file: PathBuf) -> Self {
        Self {
            http,
            settings,
            session_file,
        }
    }

    /// Stored credentials; an unreadable session counts as signed out
    pub fn load(&self) -> Option<Credentials> {
        match read_json_optional(&self.session_file) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session file");
                None
            }
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.load().is_some()
    }

    fn save(&self, credentials: &Credentials) -> LedgerResult<()> {
        write_json_atomic(&self.session_file, credentials)
    }

    /// Delete the stored session
    pub async fn sign_out(&self) -> LedgerResult<()> {
        if remove_if_exists(&self.session_file).await? {
            info!("signed out of cloud storage");
        }
        Ok(())
    }

    /// A usable access token without user interaction
    pub async fn access_token(&self) -> LedgerResult<String> {
        let credentials = self.silent().await?;
        Ok(credentials.access_token)
    }

    async fn silent(&self) -> LedgerResult<Credentials> {
        let Some(credentials) = self.load() else {
            return Err(LedgerError::Auth("not signed in".into()));
        };
        if credentials.is_fresh(Utc::now()) {
            return Ok(credentials);
        }
        let Some(refresh_token) = credentials.refresh_token.clone() else {
            return Err(LedgerError::Auth(
                "session expired and no refresh token is stored".into(),
            ));
        };

        debug!("refreshing cloud access token");
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
            ("client_id", self.settings.client_id.clone()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        let token = self.token_request(&form).await?;

        let refreshed = Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        };
        self.save(&refreshed)?;
        Ok(refreshed)
    }

    /// Silent re-authentication, falling back to interactive sign-in
    pub async fn authenticate(&self, prompt: &dyn SignInPrompt) -> LedgerResult<Credentials> {
        match self.silent().await {
            Ok(credentials) => return Ok(credentials),
            Err(e) if e.kind() == crate::error::ErrorKind::Auth => {
                debug!(reason = %e, "silent sign-in unavailable; prompting");
            }
            Err(e) => return Err(e),
        }

        let auth_url = self.authorization_url()?;
        let code = prompt.authorization_code(auth_url.as_str()).await?;
        let code = code.trim();
        if code.is_empty() {
            return Err(LedgerError::Cancelled("no authorization code entered".into()));
        }
        self.exchange_code(code).await
    }

    /// The consent page the user visits to obtain an authorization code
    pub fn authorization_url(&self) -> LedgerResult<Url> {
        if self.settings.client_id.is_empty() {
            return Err(LedgerError::Config(
                "remote.client_id is not configured".into(),
            ));
        }
        let mut url = Url::parse(&self.settings.auth_url)
            .map_err(|e| LedgerError::Config(format!("invalid remote.auth_url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }

    /// Exchange an authorization code for tokens and persist them
    pub async fn exchange_code(&self, code: &str) -> LedgerResult<Credentials> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", self.settings.client_id.clone()),
            ("redirect_uri", self.settings.redirect_uri.clone()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        let token = self.token_request(&form).await?;

        let credentials = Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        };
        self.save(&credentials)?;
        info!("signed in to cloud storage");
        Ok(credentials)
    }

    async fn token_request(&self, form: &[(&str, String)]) -> LedgerResult<TokenResponse> {
        let response = self
            .http
            .post(&self.settings.token_url)
            .timeout(self.settings.timeout())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                // invalid_grant and friends: the session is no longer valid
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    LedgerError::Auth(format!("token request rejected: {}", body.trim()))
                }
                other => classify_status(other, "token request", &body),
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| LedgerError::Auth(format!("malformed token response: {}", e)))
    }
}
