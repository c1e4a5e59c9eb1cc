//! OAuth2 public client (authorization code + PKCE, refresh token grant).
//!
//! Endpoints follow the Azure AD B2C layout under the configured authority:
//! `{authority}oauth2/v2.0/authorize` and `{authority}oauth2/v2.0/token`.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration as StdDuration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Url;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::auth::{Account, TokenCache, TokenClient, TokenResponse};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::util::urljoin;

// Scopes every sign-in asks for so the response carries an id token and a refresh token.
const RESERVED_SCOPES: [&str; 2] = ["openid", "offline_access"];

// Access tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 300;

// Browsers open speculative connections that may never send a request line.
const REQUEST_READ_TIMEOUT: StdDuration = StdDuration::from_secs(3);

const SIGNED_IN_PAGE: &str = "<html><body><h3>Authentication complete.</h3>You can close this window.</body></html>";

#[derive(Debug, Clone)]
pub struct PublicClientApp {
    client_id: String,
    authority: String,
    http: HttpClient,
    launcher: fn(&str) -> bool,
}

impl PublicClientApp {
    pub fn new(cfg: &AuthConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;
        Ok(Self {
            client_id: cfg.client_id.clone(),
            authority: cfg.authority.clone(),
            http,
            launcher: open_browser,
        })
    }

    /// Replaces the function that opens the sign-in URL. It returns whether a
    /// browser was launched; the URL is printed to stderr either way.
    pub fn with_launcher(mut self, launcher: fn(&str) -> bool) -> Self {
        self.launcher = launcher;
        self
    }

    fn authorize_endpoint(&self) -> String {
        urljoin(&self.authority, "oauth2/v2.0/authorize")
    }

    fn token_endpoint(&self) -> String {
        urljoin(&self.authority, "oauth2/v2.0/token")
    }

    fn request_scope(scopes: &[String]) -> String {
        scopes
            .iter()
            .map(String::as_str)
            .chain(RESERVED_SCOPES)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = self.token_endpoint();
        let grant = form.iter().find(|(k, _)| *k == "grant_type").map(|(_, v)| *v);
        tracing::debug!(%url, grant = ?grant, "token request");
        let resp = self.http.post(&url).form(form).send()?;
        let status = resp.status();
        let text = resp.text()?;
        // OAuth error bodies use the same JSON shape; keep them as responses.
        serde_json::from_str::<TokenResponse>(&text).map_err(|e| {
            Error::auth(format!(
                "token endpoint returned unreadable response (HTTP {}): {}",
                status, e
            ))
        })
    }

    fn authorize_url(&self, redirect_uri: &str, scope: &str, challenge: &str, state: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.authorize_endpoint(),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("response_mode", "query"),
                ("scope", scope),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| Error::config(format!("invalid authority URL {}: {}", self.authority, e)))
    }
}

impl TokenClient for PublicClientApp {
    fn accounts(&self, cache: &TokenCache) -> Vec<Account> {
        cache.accounts()
    }

    fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut TokenCache,
    ) -> Result<Option<TokenResponse>> {
        let now = Utc::now();
        if let Some(at) = cache.access_token(account, scopes, now + Duration::seconds(EXPIRY_SKEW_SECS)) {
            tracing::debug!("using cached access token");
            let mut resp = TokenResponse {
                access_token: Some(at.secret.clone()),
                token_type: Some(at.token_type.clone()),
                expires_in: Some((at.expires_on - now).num_seconds()),
                ..Default::default()
            };
            resp.extra.insert("token_source".into(), "cache".into());
            return Ok(Some(resp));
        }

        let Some(refresh_token) = cache.refresh_token(account).map(str::to_string) else {
            return Ok(None);
        };
        let scope = Self::request_scope(scopes);
        let resp = self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("scope", scope.as_str()),
        ])?;
        if resp.has_token() {
            cache.add(account.clone(), scopes, &resp, now);
        }
        Ok(Some(resp))
    }

    fn acquire_token_interactive(
        &self,
        scopes: &[String],
        cache: &mut TokenCache,
    ) -> Result<TokenResponse> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let redirect_uri = format!("http://localhost:{}", listener.local_addr()?.port());

        let verifier = random_string(64);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        let state = random_string(32);
        let scope = Self::request_scope(scopes);
        let url = self.authorize_url(&redirect_uri, &scope, &challenge, &state)?;

        eprintln!();
        eprintln!("  >> Sign in to the IMF data portal by opening this URL:");
        eprintln!("  {url}");
        if (self.launcher)(url.as_str()) {
            eprintln!("  (browser opened automatically)");
        }
        eprintln!();

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Waiting for sign-in in the browser...");
        spinner.enable_steady_tick(StdDuration::from_millis(120));
        let redirect = wait_for_redirect(&listener);
        spinner.finish_and_clear();
        let redirect = redirect?;

        if let Some(error) = redirect.error {
            return Ok(TokenResponse::error(
                error,
                redirect.error_description.unwrap_or_default(),
            ));
        }
        if redirect.state.as_deref() != Some(state.as_str()) {
            return Ok(TokenResponse::error(
                "state_mismatch",
                "authorization response state did not match the request",
            ));
        }
        let Some(code) = redirect.code else {
            return Ok(TokenResponse::error("no_code", "authorization response carried no code"));
        };

        let resp = self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
            ("scope", scope.as_str()),
        ])?;
        if resp.has_token() {
            let account = account_from_id_token(resp.id_token.as_deref());
            tracing::info!(account = %account.home_account_id, "signed in");
            cache.add(account, scopes, &resp, Utc::now());
        }
        Ok(resp)
    }
}

fn open_browser(url: &str) -> bool {
    match open::that(url) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "could not open a browser");
            false
        }
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Debug, Default, PartialEq)]
struct Redirect {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn wait_for_redirect(listener: &TcpListener) -> Result<Redirect> {
    loop {
        let (stream, _) = listener.accept()?;
        // Browsers also ask for /favicon.ico; only a request with a result ends the wait.
        match handle_request(stream) {
            Ok(Some(redirect)) => return Ok(redirect),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "ignoring loopback connection"),
        }
    }
}

fn handle_request(mut stream: TcpStream) -> Result<Option<Redirect>> {
    stream.set_read_timeout(Some(REQUEST_READ_TIMEOUT))?;
    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line)?;
    let redirect = line
        .split_whitespace()
        .nth(1)
        .and_then(parse_redirect_target)
        .filter(|r| r.code.is_some() || r.error.is_some());

    let (status, body) = match &redirect {
        Some(_) => ("200 OK", SIGNED_IN_PAGE),
        None => ("404 Not Found", ""),
    };
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()?;
    Ok(redirect)
}

fn parse_redirect_target(target: &str) -> Option<Redirect> {
    let url = Url::parse(&format!("http://localhost{target}")).ok()?;
    let mut r = Redirect::default();
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => r.code = Some(v.into_owned()),
            "state" => r.state = Some(v.into_owned()),
            "error" => r.error = Some(v.into_owned()),
            "error_description" => r.error_description = Some(v.into_owned()),
            _ => {}
        }
    }
    Some(r)
}

#[derive(Debug, Default, Deserialize)]
struct IdClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

// The id token is only read for account identity; its signature is not checked.
fn account_from_id_token(id_token: Option<&str>) -> Account {
    let claims = id_token
        .and_then(|t| t.split('.').nth(1))
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok())
        .and_then(|bytes| serde_json::from_slice::<IdClaims>(&bytes).ok())
        .unwrap_or_default();

    let uid = claims.oid.or(claims.sub).unwrap_or_else(|| "default".to_string());
    let home_account_id = match claims.tid {
        Some(tid) => format!("{uid}-{tid}"),
        None => uid,
    };
    Account {
        home_account_id,
        username: claims
            .emails
            .into_iter()
            .next()
            .or(claims.preferred_username)
            .or(claims.name),
    }
}
