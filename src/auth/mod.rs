//! Request authentication.
//!
//! Requests carry a `User-Agent` header and, under [`AuthMode::TokenAuth`], an
//! `Authorization: <type> <token>` header obtained through a [`TokenClient`].
//!
//! # Token acquisition
//!
//! 1. Load the token cache from [`AuthConfig::cache_path`] (missing file is empty).
//! 2. With at least one cached account, try silent acquisition for the first one.
//! 3. Without a token from step 2, run the interactive flow.
//! 4. Persist the cache if it changed, whichever path ran.
//! 5. Fail with [`Error::Auth`] when no `access_token` was obtained.

mod cache;
mod public_client;

pub use cache::{Account, TokenCache};
pub use public_client::PublicClientApp;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// How a connection authenticates its requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Only a `User-Agent` header is sent.
    #[default]
    NoAuth,
    /// An OAuth2 bearer token is acquired and sent as `Authorization`.
    TokenAuth,
}

/// Raw token endpoint response. Error responses share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_or_string"
    )]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TokenResponse {
    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: Some(code.into()),
            error_description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Converts a response into a token, or an [`Error::Auth`] carrying the
    /// provider's error description, error code, or "unknown error".
    pub fn into_token(self, now: DateTime<Utc>) -> Result<AuthToken> {
        match self.access_token.clone().filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(AuthToken {
                access_token,
                token_type: self.token_type.clone().unwrap_or_else(|| "Bearer".into()),
                expires_at: self.expires_in.map(|s| now + Duration::seconds(s)),
                raw: self,
            }),
            None => {
                let err = self
                    .error_description
                    .or(self.error)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(Error::auth(err))
            }
        }
    }
}

// Some identity providers send `expires_in` as a string.
fn number_or_string<'de, D>(de: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// An acquired bearer token.
#[derive(Clone, PartialEq)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// The full response the token came from.
    pub raw: TokenResponse,
}

impl AuthToken {
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// The OAuth2 library seam: account discovery plus silent and interactive
/// acquisition against a [`TokenCache`].
pub trait TokenClient: fmt::Debug {
    fn accounts(&self, cache: &TokenCache) -> Vec<Account>;

    /// Returns `Ok(None)` when nothing usable is cached for `account`.
    fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut TokenCache,
    ) -> Result<Option<TokenResponse>>;

    fn acquire_token_interactive(
        &self,
        scopes: &[String],
        cache: &mut TokenCache,
    ) -> Result<TokenResponse>;
}

/// Token authentication: configuration plus the client that talks to the
/// identity provider.
#[derive(Debug, Clone)]
pub struct TokenAuth {
    config: AuthConfig,
    client: Arc<dyn TokenClient>,
}

impl TokenAuth {
    /// Uses [`PublicClientApp`] for the configured authority.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = PublicClientApp::new(&config)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: AuthConfig, client: Arc<dyn TokenClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn acquire_token(&self) -> Result<AuthToken> {
        let path = &self.config.cache_path;
        let scopes = &self.config.scopes;
        let mut cache = TokenCache::load(path)?;

        let mut result = None;
        if let Some(account) = self.client.accounts(&cache).first() {
            tracing::debug!(account = %account.home_account_id, "attempting silent token acquisition");
            match self.client.acquire_token_silent(scopes, account, &mut cache) {
                Ok(r) => result = r,
                Err(e) => tracing::warn!(error = %e, "silent token acquisition failed"),
            }
        }

        let outcome = match result {
            Some(r) if r.has_token() => Ok(r),
            _ => {
                tracing::info!("no cached token; starting interactive sign-in");
                self.client.acquire_token_interactive(scopes, &mut cache)
            }
        };

        cache.persist(path)?;
        outcome?.into_token(Utc::now())
    }
}

/// Builds request headers for `mode`. Only [`AuthMode::TokenAuth`] contacts
/// the identity provider.
pub fn auth_headers(mode: AuthMode, token_auth: &TokenAuth, user_agent: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| Error::config(format!("invalid user agent: {e}")))?,
    );
    if mode == AuthMode::TokenAuth {
        let token = token_auth.acquire_token()?;
        let mut value = HeaderValue::from_str(&token.authorization())
            .map_err(|e| Error::auth(format!("token is not a valid header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}
