use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the IMF data client.
#[derive(Debug, Error)]
pub enum Error {
    /// Required context or configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A codelist, dataset, dimension or account is absent from the loaded structure.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Token acquisition failed on both the silent and the interactive path.
    #[error("failed to acquire token: {0}")]
    Auth(String),

    /// A query that must describe exactly one object described zero or several.
    #[error("expected exactly one {kind} in structure message, found {found}")]
    Ambiguous { kind: &'static str, found: usize },

    /// The service answered with a non-success status.
    #[error("{0}")]
    Api(String),

    /// Malformed SDMX payload.
    #[error("invalid SDMX message: {0}")]
    Parse(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct SdmxErrorResponse {
    #[serde(default)]
    pub(crate) errors: Vec<SdmxErrorEntry>,
    // Gateway and auth layers respond with {"statusCode":..,"message":..}
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct SdmxErrorEntry {
    #[serde(default)]
    pub(crate) code: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

pub(crate) fn format_api_error(status: StatusCode, url: &str, e: &SdmxErrorResponse) -> Error {
    let first = e.errors.first();
    let title = first
        .and_then(|x| x.title.as_deref())
        .or(e.message.as_deref())
        .unwrap_or("");
    let detail = first.and_then(|x| x.detail.as_deref()).unwrap_or("");
    let code = first
        .and_then(|x| x.code.as_ref())
        .map(|c| match c {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Api(format!(
            "IMF data API authentication/authorization failed (HTTP {}).\n- Call `Connection::authenticate()` to sign in, or check that the cached token has not expired\n- Delete the token cache file to force a fresh interactive sign-in\n\nServer message: {}\n{}\nrequest: {}",
            status.as_u16(),
            title,
            detail,
            url
        ));
    }

    if status == StatusCode::NOT_FOUND {
        return Error::Api(format!(
            "IMF data API returned 404.\n- The dataset, codelist or dimension key may not exist (SDMX code {})\n- Check the ids against `Connection::datasets()`\n\nServer message: {}\n{}\nrequest: {}",
            if code.is_empty() { "(none)" } else { &code },
            title,
            detail,
            url
        ));
    }

    Error::Api(format!(
        "API request failed: HTTP {} for url ({})\n{}\n{}",
        status.as_u16(),
        url,
        title,
        detail
    ))
}
