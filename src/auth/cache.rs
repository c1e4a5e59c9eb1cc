//! Persisted token cache.
//!
//! The cache is a JSON document with accounts, refresh tokens and access
//! tokens. It is read once when a token is requested and written back only
//! when its contents changed.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenResponse;
use crate::error::Result;

/// A signed-in identity known to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub home_account_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AccessTokenEntry {
    pub(crate) home_account_id: String,
    pub(crate) scopes: Vec<String>,
    pub(crate) secret: String,
    pub(crate) token_type: String,
    pub(crate) expires_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RefreshTokenEntry {
    pub(crate) secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    accounts: BTreeMap<String, Account>,
    #[serde(default)]
    access_tokens: Vec<AccessTokenEntry>,
    #[serde(default)]
    refresh_tokens: BTreeMap<String, RefreshTokenEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    data: CacheData,
    state_changed: bool,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the cache at `path`; a missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no token cache file; starting empty");
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        Self::deserialize(&text)
    }

    pub fn deserialize(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(Self {
            data: serde_json::from_str(text)?,
            state_changed: false,
        })
    }

    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    pub fn has_state_changed(&self) -> bool {
        self.state_changed
    }

    /// Writes the cache to `path` if it changed. Returns whether a write happened.
    pub fn persist(&mut self, path: &Path) -> Result<bool> {
        if !self.state_changed {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.serialize()?)?;
        self.state_changed = false;
        tracing::debug!(path = %path.display(), "token cache persisted");
        Ok(true)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.data.accounts.values().cloned().collect()
    }

    /// Records the outcome of a successful token request for `account`.
    pub fn add(
        &mut self,
        account: Account,
        scopes: &[String],
        response: &TokenResponse,
        now: DateTime<Utc>,
    ) {
        let id = account.home_account_id.clone();
        self.data.accounts.insert(id.clone(), account);

        if let Some(secret) = &response.access_token {
            let scopes = normalize(scopes);
            self.data
                .access_tokens
                .retain(|t| !(t.home_account_id == id && t.scopes == scopes));
            self.data.access_tokens.push(AccessTokenEntry {
                home_account_id: id.clone(),
                scopes,
                secret: secret.clone(),
                token_type: response.token_type.clone().unwrap_or_else(|| "Bearer".into()),
                expires_on: now + Duration::seconds(response.expires_in.unwrap_or(3600)),
            });
        }
        if let Some(secret) = &response.refresh_token {
            self.data.refresh_tokens.insert(
                id,
                RefreshTokenEntry {
                    secret: secret.clone(),
                },
            );
        }
        self.state_changed = true;
    }

    /// An access token for `account` covering `scopes` that is still valid at `at`.
    pub(crate) fn access_token(
        &self,
        account: &Account,
        scopes: &[String],
        at: DateTime<Utc>,
    ) -> Option<&AccessTokenEntry> {
        let wanted = normalize(scopes);
        self.data.access_tokens.iter().find(|t| {
            t.home_account_id == account.home_account_id
                && wanted.iter().all(|s| t.scopes.contains(s))
                && t.expires_on > at
        })
    }

    pub(crate) fn refresh_token(&self, account: &Account) -> Option<&str> {
        self.data
            .refresh_tokens
            .get(&account.home_account_id)
            .map(|r| r.secret.as_str())
    }

    /// Drops the account together with all of its tokens.
    pub fn remove_account(&mut self, account: &Account) {
        let id = &account.home_account_id;
        let before = self.data.clone();
        self.data.accounts.remove(id);
        self.data.refresh_tokens.remove(id);
        self.data.access_tokens.retain(|t| &t.home_account_id != id);
        if self.data != before {
            self.state_changed = true;
        }
    }
}

fn normalize(scopes: &[String]) -> Vec<String> {
    let mut v: Vec<String> = scopes.iter().map(|s| s.to_lowercase()).collect();
    v.sort();
    v.dedup();
    v
}
