use std::fmt;
use std::io::Read;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result, SdmxErrorResponse, format_api_error};
use crate::sdmx::{DataMessage, StructureMessage};
use crate::util::urljoin;

const STRUCTURE_ACCEPT: &str = "application/vnd.sdmx.structure+json;version=1.0";
const DATA_ACCEPT: &str = "application/vnd.sdmx.data+json;version=1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureType {
    Dataflow,
    DataStructure,
    Codelist,
}

impl StructureType {
    fn path(&self) -> &'static str {
        match self {
            StructureType::Dataflow => "dataflow",
            StructureType::DataStructure => "datastructure",
            StructureType::Codelist => "codelist",
        }
    }
}

/// Which referenced artefacts the service should include in a structure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum References {
    None,
    Children,
    Descendants,
    All,
}

impl References {
    fn as_str(&self) -> &'static str {
        match self {
            References::None => "none",
            References::Children => "children",
            References::Descendants => "descendants",
            References::All => "all",
        }
    }
}

/// A structure query: `/{type}/{agency}/{id}/{version}?references=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureQuery {
    pub resource: StructureType,
    pub agency_id: String,
    /// `None` lists every artefact of the type.
    pub id: Option<String>,
    pub version: String,
    pub references: References,
}

impl StructureQuery {
    pub fn new(resource: StructureType, id: Option<&str>) -> Self {
        Self {
            resource,
            agency_id: "all".to_string(),
            id: id.map(str::to_string),
            version: "latest".to_string(),
            references: References::None,
        }
    }

    pub fn with_references(mut self, references: References) -> Self {
        self.references = references;
        self
    }

    pub fn path(&self) -> String {
        let mut p = format!(
            "{}/{}/{}/{}",
            self.resource.path(),
            self.agency_id,
            self.id.as_deref().unwrap_or("all"),
            self.version
        );
        if self.references != References::None {
            p.push_str("?references=");
            p.push_str(self.references.as_str());
        }
        p
    }
}

/// Identifies a dataflow for a data query: `agency,id,version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRef {
    pub id: String,
    pub agency_id: Option<String>,
    pub version: Option<String>,
}

impl FlowRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agency_id: None,
            version: None,
        }
    }

    pub fn with_agency(mut self, agency_id: impl Into<String>) -> Self {
        self.agency_id = Some(agency_id.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl From<&str> for FlowRef {
    fn from(id: &str) -> Self {
        FlowRef::new(id)
    }
}

impl fmt::Display for FlowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.agency_id, &self.version) {
            (None, None) => f.write_str(&self.id),
            (agency, version) => write!(
                f,
                "{},{},{}",
                agency.as_deref().unwrap_or("all"),
                self.id,
                version.as_deref().unwrap_or("latest")
            ),
        }
    }
}

/// A data query: `/data/{flow}/{key}` plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    pub flow: FlowRef,
    /// Dot-delimited dimension key; empty selects everything.
    pub key: String,
    pub params: Vec<(String, String)>,
}

impl DataQuery {
    pub fn path(&self) -> String {
        let key = if self.key.is_empty() { "all" } else { self.key.as_str() };
        format!("data/{}/{}", self.flow, key)
    }
}

/// The SDMX protocol client a [`crate::Connection`] delegates to.
///
/// Every call is blocking. `headers` are the connection's current request
/// headers (user agent and, when authenticated, `Authorization`).
pub trait SdmxService: fmt::Debug {
    fn structure(&self, query: &StructureQuery, headers: &HeaderMap) -> Result<StructureMessage>;

    fn data(&self, query: &DataQuery, headers: &HeaderMap) -> Result<DataMessage>;
}

/// [`SdmxService`] over the SDMX 2.1 REST API with SDMX-JSON payloads.
#[derive(Debug, Clone)]
pub struct HttpService {
    url: String,
    progress: bool,
    http: HttpClient,
}

impl HttpService {
    pub fn new(cfg: &ConnectionConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().timeout(cfg.timeout);
        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;
        Ok(Self {
            url: cfg.url.clone(),
            progress: cfg.progress,
            http,
        })
    }

    fn get_text(
        &self,
        path: &str,
        params: &[(String, String)],
        accept: &'static str,
        headers: &HeaderMap,
        show_progress: bool,
    ) -> Result<String> {
        let url = urljoin(&self.url, path);
        tracing::debug!(%url, "GET");
        let mut resp = self
            .http
            .get(&url)
            .headers(headers.clone())
            .header(ACCEPT, HeaderValue::from_static(accept))
            .query(params)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            // Try to parse SDMX error payloads for actionable messages.
            if let Ok(err_json) = serde_json::from_str::<SdmxErrorResponse>(&text) {
                if !err_json.errors.is_empty() || err_json.message.is_some() {
                    return Err(format_api_error(status, &url, &err_json));
                }
            }
            return Err(Error::Api(format!(
                "API request failed: HTTP {} for url ({})\n{}",
                status, url, text
            )));
        }

        let pb = match resp.content_length() {
            Some(len) if show_progress && self.progress => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                ) {
                    pb.set_style(style.progress_chars("=>-"));
                }
                Some(pb)
            }
            _ => None,
        };

        let mut body = Vec::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = resp.read(&mut buf)?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        String::from_utf8(body).map_err(|e| Error::parse(format!("response is not UTF-8: {e}")))
    }
}

impl SdmxService for HttpService {
    fn structure(&self, query: &StructureQuery, headers: &HeaderMap) -> Result<StructureMessage> {
        let text = self.get_text(&query.path(), &[], STRUCTURE_ACCEPT, headers, false)?;
        StructureMessage::from_json(&text)
    }

    fn data(&self, query: &DataQuery, headers: &HeaderMap) -> Result<DataMessage> {
        let text = self.get_text(&query.path(), &query.params, DATA_ACCEPT, headers, true)?;
        DataMessage::from_json(&text)
    }
}
