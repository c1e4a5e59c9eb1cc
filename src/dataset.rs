use std::cell::OnceCell;

use crate::connection::{Connection, codes_table};
use crate::error::{Error, Result};
use crate::names::{KeepPolicy, LookupEnv};
use crate::sdmx::{Codelist, Dataflow, DataStructure, StructureMessage};
use crate::service::{FlowRef, References, StructureQuery, StructureType};
use crate::table::Table;

/// A handle bound to one dataset's structure message.
///
/// Borrows the [`Connection`] that created it; data and codelist requests go
/// through that connection and its current headers. Derived tables are built
/// on first use and kept for the lifetime of the handle.
#[derive(Debug)]
pub struct Dataset<'c> {
    connection: &'c Connection,
    message: StructureMessage,
    flow: Dataflow,
    dimension_names: OnceCell<Table>,
    codelists_summary: OnceCell<Table>,
    descendants: OnceCell<StructureMessage>,
}

impl<'c> Dataset<'c> {
    /// Binds `message` to `connection`. The message must hold exactly one dataflow.
    pub fn new(connection: &'c Connection, message: StructureMessage) -> Result<Self> {
        let flow = match message.dataflows.as_slice() {
            [flow] => flow.clone(),
            flows => {
                return Err(Error::Ambiguous {
                    kind: "dataflow",
                    found: flows.len(),
                });
            }
        };
        tracing::info!(
            id = %flow.id,
            agency = %flow.agency_id,
            version = %flow.version,
            "dataset bound"
        );
        Ok(Self {
            connection,
            message,
            flow,
            dimension_names: OnceCell::new(),
            codelists_summary: OnceCell::new(),
            descendants: OnceCell::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.flow.id
    }

    pub fn agency_id(&self) -> &str {
        &self.flow.agency_id
    }

    pub fn version(&self) -> &str {
        &self.flow.version
    }

    pub fn name(&self) -> &str {
        &self.flow.name
    }

    /// The structure message this handle was built from.
    pub fn message(&self) -> &StructureMessage {
        &self.message
    }

    fn data_structure(&self) -> Result<&DataStructure> {
        self.message.data_structure_for(&self.flow).ok_or_else(|| {
            let id = self
                .flow
                .structure
                .as_ref()
                .map_or_else(|| format!("DSD_{}", self.flow.id), |r| r.id.clone());
            Error::not_found("data structure", id)
        })
    }

    /// One row per dimension in key order: `dimension_id`, `codelist_id`.
    ///
    /// The codelist id comes from the core representation of the dimension's
    /// concept and is reported as declared, whether or not the codelist itself
    /// is part of the message. Dimensions without one get a null.
    pub fn dimension_names(&self) -> Result<&Table> {
        if let Some(table) = self.dimension_names.get() {
            return Ok(table);
        }
        let dsd = self.data_structure()?;
        let mut table = Table::new(["dimension_id", "codelist_id"]);
        for dim in &dsd.dimensions {
            let codelist = dim
                .concept_identity
                .as_ref()
                .and_then(|r| self.message.concept(r))
                .and_then(|c| c.core_representation.as_ref())
                .and_then(|rep| rep.enumerated.as_ref())
                .map(|cl| cl.id.as_str());
            table.push_row(vec![dim.id.as_str().into(), codelist.into()]);
        }
        Ok(self.dimension_names.get_or_init(|| table))
    }

    /// Message holding the dataset's codelists: the bound message when it
    /// carries any, else the data structure fetched with its descendants.
    fn codelist_message(&self) -> Result<&StructureMessage> {
        if !self.message.codelists.is_empty() {
            return Ok(&self.message);
        }
        if let Some(msg) = self.descendants.get() {
            return Ok(msg);
        }
        let dsd_id = match self.data_structure() {
            Ok(dsd) => dsd.id.clone(),
            Err(_) => format!("DSD_{}", self.flow.id),
        };
        let query = StructureQuery::new(StructureType::DataStructure, Some(&dsd_id))
            .with_references(References::Descendants);
        let msg = self.connection.structure(&query)?;
        tracing::debug!(dsd = %dsd_id, codelists = msg.codelists.len(), "fetched codelists");
        Ok(self.descendants.get_or_init(|| msg))
    }

    /// One row per codelist of the dataset: `codelist_id`, `name`, `version`, `n_codes`.
    pub fn codelists_summary(&self) -> Result<&Table> {
        if let Some(table) = self.codelists_summary.get() {
            return Ok(table);
        }
        let msg = self.codelist_message()?;
        let mut table = Table::new(["codelist_id", "name", "version", "n_codes"]);
        for cl in &msg.codelists {
            table.push_row(vec![
                cl.id.as_str().into(),
                cl.name.as_str().into(),
                cl.version.as_str().into(),
                cl.len().into(),
            ]);
        }
        Ok(self.codelists_summary.get_or_init(|| table))
    }

    fn find_codelist(&self, id: &str) -> Result<&Codelist> {
        self.codelist_message()?
            .codelist(id)
            .ok_or_else(|| Error::not_found("codelist", id))
    }

    /// Codes of one of the dataset's codelists: `code_id`, `name`, `description`.
    pub fn get_codelist(&self, id: &str) -> Result<Table> {
        Ok(codes_table(self.find_codelist(id)?))
    }

    /// Maps sanitized code names to code ids.
    pub fn get_codelist_env(&self, id: &str) -> Result<LookupEnv> {
        let table = self.get_codelist(id)?;
        Ok(codes_env(&table))
    }

    /// The codes table together with its lookup environment.
    pub fn codelist(&self, id: &str) -> Result<(Table, LookupEnv)> {
        let table = self.get_codelist(id)?;
        let env = codes_env(&table);
        Ok((table, env))
    }

    /// Maps dimension ids to their codelist ids; uncoded dimensions are left out.
    pub fn get_dimension_names_env(&self) -> Result<LookupEnv> {
        let table = self.dimension_names()?;
        Ok(LookupEnv::build(
            table.pairs("dimension_id", "codelist_id"),
            KeepPolicy::First,
        ))
    }

    pub fn dimension_env(&self) -> Result<LookupEnv> {
        self.get_dimension_names_env()
    }

    /// Queries this dataset's observations. See [`Connection::get_data`].
    pub fn get_data(
        &self,
        key: &str,
        params: &[(&str, &str)],
        convert_dates: bool,
    ) -> Result<Table> {
        let mut flow = FlowRef::new(self.flow.id.as_str());
        if !self.flow.agency_id.is_empty() {
            flow = flow.with_agency(self.flow.agency_id.as_str());
        }
        if !self.flow.version.is_empty() {
            flow = flow.with_version(self.flow.version.as_str());
        }
        self.connection.get_data(flow, key, params, convert_dates)
    }
}

fn codes_env(table: &Table) -> LookupEnv {
    LookupEnv::build(table.pairs("name", "code_id"), KeepPolicy::First)
}
