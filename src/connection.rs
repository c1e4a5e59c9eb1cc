use reqwest::header::HeaderMap;

use crate::auth::{AuthMode, TokenAuth, auth_headers};
use crate::config::ConnectionConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::names::{KeepPolicy, LookupEnv};
use crate::period::{DATE, TIME_PERIOD, convert_time_period};
use crate::sdmx::{Codelist, StructureMessage, resolve_codelist};
use crate::service::{
    DataQuery, FlowRef, HttpService, References, SdmxService, StructureQuery, StructureType,
};
use crate::table::{Table, Value};

/// A connection to the IMF SDMX service.
///
/// Owns the protocol client and the headers sent with every request.
/// [`Dataset`] handles borrow the connection and issue their requests through it.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    service: Box<dyn SdmxService>,
    token_auth: TokenAuth,
    mode: AuthMode,
    headers: HeaderMap,
}

impl Connection {
    /// Creates a connection configured from `IMFIDATA_*` variables and/or `.imfidatarc`.
    ///
    /// With [`AuthMode::TokenAuth`] this signs in immediately (silently when a
    /// cached account allows it).
    pub fn from_env(mode: AuthMode) -> Result<Self> {
        Self::new(ConnectionConfig::from_env()?, mode)
    }

    pub fn new(config: ConnectionConfig, mode: AuthMode) -> Result<Self> {
        let service = HttpService::new(&config)?;
        let token_auth = TokenAuth::new(config.auth.clone())?;
        Self::with_parts(config, mode, Box::new(service), token_auth)
    }

    /// Assembles a connection from an explicit protocol client and token provider.
    pub fn with_parts(
        config: ConnectionConfig,
        mode: AuthMode,
        service: Box<dyn SdmxService>,
        token_auth: TokenAuth,
    ) -> Result<Self> {
        let headers = auth_headers(mode, &token_auth, &config.user_agent)?;
        Ok(Self {
            config,
            service,
            token_auth,
            mode,
            headers,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Acquires a token and attaches it to subsequent requests. On failure the
    /// current headers are left untouched.
    pub fn authenticate(&mut self) -> Result<()> {
        self.set_mode(AuthMode::TokenAuth)
    }

    /// Drops the `Authorization` header from subsequent requests.
    pub fn remove_authentication(&mut self) -> Result<()> {
        self.set_mode(AuthMode::NoAuth)
    }

    fn set_mode(&mut self, mode: AuthMode) -> Result<()> {
        let headers = auth_headers(mode, &self.token_auth, &self.config.user_agent)?;
        self.headers = headers;
        self.mode = mode;
        tracing::info!(status = self.auth_status(), "authentication changed");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.mode == AuthMode::TokenAuth
    }

    pub fn auth_status(&self) -> &'static str {
        match self.mode {
            AuthMode::NoAuth => "not authenticated",
            AuthMode::TokenAuth => "authenticated",
        }
    }

    pub(crate) fn structure(&self, query: &StructureQuery) -> Result<StructureMessage> {
        self.service.structure(query, &self.headers)
    }

    /// Every dataflow the service exposes: `id`, `version`, `agency_id`, `name`.
    pub fn datasets(&self) -> Result<Table> {
        let msg = self.structure(&StructureQuery::new(StructureType::Dataflow, None))?;
        let mut table = Table::new(["id", "version", "agency_id", "name"]);
        for flow in &msg.dataflows {
            table.push_row(vec![
                flow.id.as_str().into(),
                flow.version.as_str().into(),
                flow.agency_id.as_str().into(),
                flow.name.as_str().into(),
            ]);
        }
        Ok(table)
    }

    /// Fetches the structure of dataset `id` and binds a handle to it.
    ///
    /// Fails with [`Error::Ambiguous`] unless the message holds exactly one dataflow.
    pub fn get_dataset(&self, id: &str) -> Result<Dataset<'_>> {
        let query =
            StructureQuery::new(StructureType::Dataflow, Some(id)).with_references(References::All);
        let msg = self.structure(&query)?;
        Dataset::new(self, msg)
    }

    fn fetch_codelist(&self, id: &str) -> Result<Codelist> {
        let msg = self.structure(&StructureQuery::new(StructureType::Codelist, Some(id)))?;
        msg.codelists
            .into_iter()
            .find(|cl| cl.id == id)
            .ok_or_else(|| Error::not_found("codelist", id))
    }

    /// Codes of a codelist, independent of any dataset: `code_id`, `name`, `description`.
    pub fn get_codelist(&self, id: &str) -> Result<Table> {
        Ok(codes_table(&self.fetch_codelist(id)?))
    }

    pub fn get_codelist_env(&self, id: &str) -> Result<LookupEnv> {
        let table = self.get_codelist(id)?;
        Ok(LookupEnv::build(table.pairs("name", "code_id"), KeepPolicy::First))
    }

    /// Dimensions and attributes of dataset `id` with the codelist each one is
    /// enumerated by: `dimension_id`, `kind`, `codelist_id`.
    ///
    /// Unlike [`Dataset::dimension_names`], this walks the full resolution chain
    /// of [`resolve_codelist`].
    pub fn get_dimensions(&self, id: &str) -> Result<Table> {
        let dsd_id = format!("DSD_{id}");
        let query = StructureQuery::new(StructureType::DataStructure, Some(&dsd_id))
            .with_references(References::Descendants);
        let msg = self.structure(&query)?;
        let dsd = msg
            .data_structures
            .iter()
            .find(|d| d.id == dsd_id)
            .or_else(|| msg.data_structures.first())
            .ok_or_else(|| Error::not_found("data structure", dsd_id.as_str()))?;

        let mut table = Table::new(["dimension_id", "kind", "codelist_id"]);
        for component in dsd.dimensions.iter().chain(&dsd.attributes) {
            let cl = resolve_codelist(&msg, component);
            table.push_row(vec![
                component.id.as_str().into(),
                component.kind.as_str().into(),
                cl.map(|c| c.id.as_str()).into(),
            ]);
        }
        Ok(table)
    }

    /// Queries observations of `flow` for a dot-delimited dimension `key`
    /// (see [`crate::make_key`]) and query `params` such as `startPeriod`.
    ///
    /// With `convert_dates`, a non-empty result gains a `date` column holding the
    /// end of each `TIME_PERIOD`.
    pub fn get_data(
        &self,
        flow: impl Into<FlowRef>,
        key: &str,
        params: &[(&str, &str)],
        convert_dates: bool,
    ) -> Result<Table> {
        let query = DataQuery {
            flow: flow.into(),
            key: key.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let msg = self.service.data(&query, &self.headers)?;
        let table = msg.to_table();
        tracing::debug!(flow = %query.flow, key, rows = table.len(), "data retrieved");
        if convert_dates && !table.is_empty() {
            return Ok(convert_time_period(&table, TIME_PERIOD, DATE));
        }
        Ok(table)
    }
}

pub(crate) fn codes_table(cl: &Codelist) -> Table {
    let mut table = Table::new(["code_id", "name", "description"]);
    for code in &cl.codes {
        table.push_row(vec![
            code.id.as_str().into(),
            code.name.as_str().into(),
            Value::from(code.description.as_str()),
        ]);
    }
    table
}
