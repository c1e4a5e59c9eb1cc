use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_URL: &str = "https://api.imf.org/external/sdmx/2.1";
pub const DEFAULT_USER_AGENT: &str = "imfidata-client";
pub const DEFAULT_CLIENT_ID: &str = "446ce2fa-88b1-436c-b8e6-94491ca4f6fb";
pub const DEFAULT_AUTHORITY: &str =
    "https://imfprdb2c.b2clogin.com/imfprdb2c.onmicrosoft.com/b2c_1a_signin_aad_simple_user_journey/";
pub const DEFAULT_SCOPE: &str =
    "https://imfprdb2c.onmicrosoft.com/4042e178-3e2f-4ff9-ac38-1276c901c13d/iData.Login";
pub const DEFAULT_CACHE_PATH: &str = "msal_token_cache.bin";

/// Settings for the OAuth2 public client used by token authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Application (client) id registered with the identity provider.
    pub client_id: String,
    /// Authority URL, e.g. an Azure B2C policy endpoint ending in `/`.
    pub authority: String,
    /// Scopes requested for the access token.
    pub scopes: Vec<String>,
    /// Location of the persisted token cache.
    pub cache_path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

impl AuthConfig {
    /// Builds the configuration from `IMFIDATA_*` variables, then `.imfidatarc`, then defaults.
    pub fn from_env() -> Result<Self> {
        let rc = find_rc()?.unwrap_or_default();
        Ok(Self::resolve(&EnvLookup, rc))
    }

    fn resolve(env: &dyn Lookup, rc: RcConfig) -> Self {
        let client_id = env
            .var("IMFIDATA_CLIENT_ID")
            .or(rc.client_id)
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string());
        let authority = env
            .var("IMFIDATA_AUTHORITY")
            .or(rc.authority)
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string());
        let scope = env
            .var("IMFIDATA_SCOPE")
            .or(rc.scope)
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
        let cache_path = env
            .var("IMFIDATA_CACHE_PATH")
            .or(rc.cache_path)
            .unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string());

        Self {
            client_id,
            authority,
            scopes: scope.split_whitespace().map(str::to_string).collect(),
            cache_path: PathBuf::from(cache_path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base SDMX REST URL, typically `https://api.imf.org/external/sdmx/2.1`.
    pub url: String,
    /// Sent as `User-Agent` on every request.
    pub user_agent: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    pub timeout: Duration,
    /// Show a byte progress bar while data responses download.
    pub progress: bool,
    pub auth: AuthConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify: true,
            timeout: Duration::from_secs(60),
            progress: false,
            auth: AuthConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Resolves configuration in order of precedence:
    /// - environment variables `IMFIDATA_URL`, `IMFIDATA_CLIENT_ID`, ...
    /// - config file from `IMFIDATA_RC` or `.imfidatarc`
    /// - built-in defaults
    pub fn from_env() -> Result<Self> {
        let rc = find_rc()?.unwrap_or_default();
        Ok(Self::resolve(&EnvLookup, rc))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    fn resolve(env: &dyn Lookup, rc: RcConfig) -> Self {
        let url = env
            .var("IMFIDATA_URL")
            .or_else(|| rc.url.clone())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let verify = rc.verify.unwrap_or(true);
        Self {
            url,
            verify,
            auth: AuthConfig::resolve(env, rc),
            ..Self::default()
        }
    }
}

trait Lookup {
    fn var(&self, key: &str) -> Option<String>;
}

struct EnvLookup;

impl Lookup for EnvLookup {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Default, Clone)]
struct RcConfig {
    url: Option<String>,
    client_id: Option<String>,
    authority: Option<String>,
    scope: Option<String>,
    cache_path: Option<String>,
    verify: Option<bool>,
}

fn find_rc() -> Result<Option<RcConfig>> {
    for rc_path in rc_candidates() {
        if rc_path.exists() {
            let cfg = read_rc(&rc_path).map_err(|e| {
                Error::config(format!(
                    "failed to read configuration file {}: {}",
                    rc_path.display(),
                    e
                ))
            })?;
            tracing::debug!(path = %rc_path.display(), "loaded rc configuration");
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn read_rc(path: &Path) -> std::io::Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // URLs contain ':' so only the first one separates key from value.
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        if v.is_empty() {
            continue;
        }
        match k.trim() {
            "url" => cfg.url = Some(v.to_string()),
            "client_id" => cfg.client_id = Some(v.to_string()),
            "authority" => cfg.authority = Some(v.to_string()),
            "scope" => cfg.scope = Some(v.to_string()),
            "cache_path" => cfg.cache_path = Some(v.to_string()),
            "verify" => cfg.verify = Some(v != "0" && !v.eq_ignore_ascii_case("false")),
            _ => {}
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) IMFIDATA_RC (explicit)
    // 2) ./.imfidatarc
    // 3) ~/.imfidatarc
    if let Ok(p) = std::env::var("IMFIDATA_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".imfidatarc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".imfidatarc"));
    }
    v
}
