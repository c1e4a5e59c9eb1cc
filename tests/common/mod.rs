#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use imfdata::sdmx::{DataMessage, StructureMessage};
use imfdata::{
    Account, AuthConfig, AuthMode, Connection, ConnectionConfig, DataQuery, Error, Result,
    SdmxService, StructureQuery, TokenAuth, TokenCache, TokenClient, TokenResponse,
};
use reqwest::header::HeaderMap;

/// Serves canned SDMX-JSON payloads keyed by request path and records every
/// request with the headers it carried.
#[derive(Debug, Default, Clone)]
pub struct FakeService {
    structures: HashMap<String, &'static str>,
    data: HashMap<String, &'static str>,
    pub requests: Arc<Mutex<Vec<(String, HeaderMap)>>>,
    pub data_params: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

impl FakeService {
    pub fn with_structure(mut self, path: &str, json: &'static str) -> Self {
        self.structures.insert(path.to_string(), json);
        self
    }

    pub fn with_data(mut self, path: &str, json: &'static str) -> Self {
        self.data.insert(path.to_string(), json);
        self
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn last_headers(&self) -> HeaderMap {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, h)| h.clone())
            .unwrap_or_default()
    }

    /// Query parameters of the most recent data request.
    pub fn last_params(&self) -> Vec<(String, String)> {
        self.data_params
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), headers.clone()));
    }
}

impl SdmxService for FakeService {
    fn structure(&self, query: &StructureQuery, headers: &HeaderMap) -> Result<StructureMessage> {
        let path = query.path();
        self.record(&path, headers);
        match self.structures.get(&path) {
            Some(json) => StructureMessage::from_json(json),
            None => Err(Error::Api(format!("HTTP 404 for {path}"))),
        }
    }

    fn data(&self, query: &DataQuery, headers: &HeaderMap) -> Result<DataMessage> {
        let path = query.path();
        self.record(&path, headers);
        self.data_params.lock().unwrap().push(query.params.clone());
        match self.data.get(&path) {
            Some(json) => DataMessage::from_json(json),
            None => Err(Error::Api(format!("HTTP 404 for {path}"))),
        }
    }
}

/// Hands out a fixed token on interactive sign-in, or fails when it has none.
#[derive(Debug, Default)]
pub struct FakeTokenClient {
    pub token: Option<String>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl TokenClient for FakeTokenClient {
    fn accounts(&self, cache: &TokenCache) -> Vec<Account> {
        cache.accounts()
    }

    fn acquire_token_silent(
        &self,
        _scopes: &[String],
        _account: &Account,
        _cache: &mut TokenCache,
    ) -> Result<Option<TokenResponse>> {
        self.calls.lock().unwrap().push("silent");
        Ok(None)
    }

    fn acquire_token_interactive(
        &self,
        scopes: &[String],
        cache: &mut TokenCache,
    ) -> Result<TokenResponse> {
        self.calls.lock().unwrap().push("interactive");
        let Some(token) = &self.token else {
            return Ok(TokenResponse::error("access_denied", "User cancelled the sign-in"));
        };
        let resp = TokenResponse {
            access_token: Some(token.clone()),
            token_type: Some("Bearer".into()),
            expires_in: Some(3600),
            ..Default::default()
        };
        let account = Account {
            home_account_id: "user-tenant".into(),
            username: Some("analyst@example.org".into()),
        };
        cache.add(account, scopes, &resp, Utc::now());
        Ok(resp)
    }
}

pub fn config(dir: &tempfile::TempDir) -> ConnectionConfig {
    ConnectionConfig {
        auth: AuthConfig {
            cache_path: dir.path().join("token_cache.json"),
            ..AuthConfig::default()
        },
        ..ConnectionConfig::default()
    }
}

pub fn connect(
    service: &FakeService,
    client: Arc<FakeTokenClient>,
    dir: &tempfile::TempDir,
    mode: AuthMode,
) -> Result<Connection> {
    let cfg = config(dir);
    let token_auth = TokenAuth::with_client(cfg.auth.clone(), client);
    Connection::with_parts(cfg, mode, Box::new(service.clone()), token_auth)
}

pub const IFS_DATAFLOW_PATH: &str = "dataflow/all/IFS/latest?references=all";

/// Dataflow IFS with FREQ and REF_AREA, both enumerated at concept level.
pub const IFS_DATAFLOW: &str = r#"{
  "meta": {"id": "IFS-STRUCT"},
  "data": {
    "dataflows": [{
      "id": "IFS", "agencyID": "IMF.STA", "version": "8.0.0",
      "name": "International Financial Statistics",
      "structure": "urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=IMF.STA:DSD_IFS(8.0.0)"
    }],
    "dataStructures": [{
      "id": "DSD_IFS", "agencyID": "IMF.STA", "version": "8.0.0", "name": "IFS",
      "dataStructureComponents": {
        "dimensionList": {
          "dimensions": [
            {"id": "FREQ", "position": 0,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_MASTER(1.0.0).FREQ"},
            {"id": "REF_AREA", "position": 1,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_MASTER(1.0.0).REF_AREA"}
          ]
        }
      }
    }],
    "conceptSchemes": [{
      "id": "CS_MASTER", "agencyID": "IMF", "version": "1.0.0", "name": "Master concepts",
      "concepts": [
        {"id": "FREQ", "name": "Frequency",
         "coreRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_FREQ(1.0.0)"}},
        {"id": "REF_AREA", "name": "Reference area",
         "coreRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_AREA(2.1.0)"}}
      ]
    }],
    "codelists": [
      {"id": "CL_FREQ", "agencyID": "IMF", "version": "1.0.0", "name": "Frequency",
       "codes": [
         {"id": "A", "name": "Annual"},
         {"id": "Q", "name": "Quarterly"},
         {"id": "M", "name": "Monthly"}
       ]},
      {"id": "CL_AREA", "agencyID": "IMF", "version": "2.1.0", "name": "Areas",
       "codes": [
         {"id": "US", "name": "United States", "description": "United States of America"},
         {"id": "GB", "name": "United Kingdom"},
         {"id": "G001", "name": "United States"}
       ]}
    ]
  }
}"#;

pub const TWO_FLOWS: &str = r#"{
  "data": {
    "dataflows": [
      {"id": "IFS", "agencyID": "IMF.STA", "version": "8.0.0", "name": "International Financial Statistics"},
      {"id": "BOP", "agencyID": "IMF.STA", "version": "3.0.0", "name": "Balance of Payments"}
    ]
  }
}"#;

pub const NO_FLOWS: &str = r#"{"data": {"dataflows": []}}"#;

pub const BOP_DATAFLOW_PATH: &str = "dataflow/all/BOP/latest?references=all";

/// Dataflow BOP without codelists; INDICATOR's concept has no enumeration and
/// COUNTERPART's codelist is declared but absent.
pub const BOP_DATAFLOW: &str = r#"{
  "data": {
    "dataflows": [{
      "id": "BOP", "agencyID": "IMF.STA", "version": "3.0.0",
      "names": {"en": "Balance of Payments", "fr": "Balance des paiements"},
      "structure": {"id": "DSD_BOP", "agencyID": "IMF.STA", "version": "3.0.0"}
    }],
    "dataStructures": [{
      "id": "DSD_BOP", "agencyID": "IMF.STA", "version": "3.0.0", "name": "BOP",
      "dataStructureComponents": {
        "dimensionList": {
          "dimensions": [
            {"id": "INDICATOR", "position": 0,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_BOP(1.0.0).INDICATOR",
             "localRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_BOP_INDICATOR(1.0.0)"}},
            {"id": "COUNTERPART", "position": 1,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_BOP(1.0.0).COUNTERPART"}
          ]
        }
      }
    }],
    "conceptSchemes": [{
      "id": "CS_BOP", "agencyID": "IMF", "version": "1.0.0", "name": "BOP concepts",
      "concepts": [
        {"id": "INDICATOR", "name": "Indicator"},
        {"id": "COUNTERPART", "name": "Counterpart area",
         "coreRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_COUNTERPART(1.0.0)"}}
      ]
    }]
  }
}"#;

pub const BOP_DSD_PATH: &str = "datastructure/all/DSD_BOP/latest?references=descendants";

pub const BOP_DSD: &str = r#"{
  "data": {
    "dataStructures": [{
      "id": "DSD_BOP", "agencyID": "IMF.STA", "version": "3.0.0", "name": "BOP",
      "dataStructureComponents": {
        "dimensionList": {"dimensions": [{"id": "INDICATOR", "position": 0}]}
      }
    }],
    "codelists": [
      {"id": "CL_BOP_INDICATOR", "agencyID": "IMF", "version": "1.0.0", "name": "BOP indicators",
       "codes": [
         {"id": "CA", "name": "Current account"},
         {"id": "KA", "name": "Capital account"}
       ]},
      {"id": "CL_COUNTERPART", "agencyID": "IMF", "version": "1.0.0", "name": "Counterpart areas",
       "codes": [{"id": "W1", "name": "World"}]}
    ]
  }
}"#;

pub const IFS_DSD_PATH: &str = "datastructure/all/DSD_IFS/latest?references=descendants";

/// FREQ has a local codelist, REF_AREA a concept-level one, INDICATOR only
/// matches by name and UNIT nothing at all.
pub const IFS_DSD: &str = r#"{
  "data": {
    "dataStructures": [{
      "id": "DSD_IFS", "agencyID": "IMF.STA", "version": "8.0.0", "name": "IFS",
      "dataStructureComponents": {
        "dimensionList": {
          "dimensions": [
            {"id": "FREQ", "position": 0,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_MASTER(1.0.0).FREQ",
             "localRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_FREQ_IFS(1.0.0)"}},
            {"id": "REF_AREA", "position": 1,
             "conceptIdentity": "urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=IMF:CS_MASTER(1.0.0).REF_AREA"},
            {"id": "INDICATOR", "position": 2}
          ],
          "timeDimensions": [{"id": "TIME_PERIOD", "position": 3}]
        },
        "attributeList": {"attributes": [{"id": "UNIT"}]}
      }
    }],
    "conceptSchemes": [{
      "id": "CS_MASTER", "agencyID": "IMF", "version": "1.0.0",
      "concepts": [
        {"id": "FREQ", "name": "Frequency",
         "coreRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_FREQ(1.0.0)"}},
        {"id": "REF_AREA", "name": "Reference area",
         "coreRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=IMF:CL_AREA(2.1.0)"}}
      ]
    }],
    "codelists": [
      {"id": "CL_FREQ", "agencyID": "IMF", "version": "1.0.0", "name": "Frequency", "codes": []},
      {"id": "CL_FREQ_IFS", "agencyID": "IMF", "version": "1.0.0", "name": "IFS frequency", "codes": []},
      {"id": "CL_AREA", "agencyID": "IMF", "version": "2.1.0", "name": "Areas", "codes": []},
      {"id": "CL_INDICATOR", "agencyID": "IMF", "version": "1.0.0", "name": "Indicators", "codes": []}
    ]
  }
}"#;

pub const DATAFLOWS_PATH: &str = "dataflow/all/all/latest";

pub const CL_UNIT_PATH: &str = "codelist/all/CL_UNIT/latest";

pub const CL_UNIT: &str = r#"{
  "data": {
    "codelists": [{
      "id": "CL_UNIT", "agencyID": "IMF", "version": "1.0.0", "name": "Units",
      "codes": [
        {"id": "USD", "name": "US dollar", "description": "United States dollar"},
        {"id": "XDR", "name": "SDR"}
      ]
    }]
  }
}"#;

pub const IFS_DATA_PATH: &str = "data/IMF.STA,IFS,8.0.0/Q.US+GB";

pub const IFS_DATA: &str = r#"{
  "data": {
    "dataSets": [{
      "structure": 0,
      "series": {
        "0:0": {"observations": {"0": ["101.5"], "1": [102.25]}},
        "0:1": {"observations": {"1": [null]}}
      }
    }],
    "structures": [{
      "dimensions": {
        "series": [
          {"id": "FREQ", "values": [{"id": "Q"}]},
          {"id": "REF_AREA", "values": [{"id": "US"}, {"id": "GB"}]}
        ],
        "observation": [{"id": "TIME_PERIOD", "values": [{"id": "2020-Q1"}, {"id": "2020-Q2"}]}]
      }
    }]
  }
}"#;

pub const BARE_FLOW_PATH: &str = "dataflow/all/X/latest?references=all";

/// A dataflow that carries neither agency nor version.
pub const BARE_FLOW: &str = r#"{"data": {"dataflows": [{"id": "X", "name": "x"}]}}"#;

pub const BARE_DATA_PATH: &str = "data/X/A";

pub const EMPTY_DATA_PATH: &str = "data/IFS/A.ZZ";

pub const EMPTY_DATA: &str = r#"{"data": {"dataSets": [], "structures": []}}"#;

pub fn service() -> FakeService {
    FakeService::default()
        .with_structure(IFS_DATAFLOW_PATH, IFS_DATAFLOW)
        .with_structure(BOP_DATAFLOW_PATH, BOP_DATAFLOW)
        .with_structure(BOP_DSD_PATH, BOP_DSD)
        .with_structure(IFS_DSD_PATH, IFS_DSD)
        .with_structure(DATAFLOWS_PATH, TWO_FLOWS)
        .with_structure(CL_UNIT_PATH, CL_UNIT)
        .with_structure("dataflow/all/PAIR/latest?references=all", TWO_FLOWS)
        .with_structure("dataflow/all/NONE/latest?references=all", NO_FLOWS)
        .with_data(IFS_DATA_PATH, IFS_DATA)
        .with_structure(BARE_FLOW_PATH, BARE_FLOW)
        .with_data(EMPTY_DATA_PATH, EMPTY_DATA)
        .with_data(BARE_DATA_PATH, EMPTY_DATA)
}
