//! A Rust client for the IMF SDMX data API.
//!
//! A [`Connection`] lists dataflows, binds [`Dataset`] handles and retrieves
//! observations as [`Table`]s. Dataset handles describe dimensions and
//! codelists and build [`LookupEnv`]s that map readable names to codes.
//!
//! ## Quick start
//! - Configure the service via environment variables (`IMFIDATA_URL`,
//!   `IMFIDATA_CLIENT_ID`, ...) or a `.imfidatarc` file in the current directory or
//!   your home directory. Every setting has a default for the public IMF endpoint.
//! - Public data needs no sign-in. [`Connection::authenticate`] runs the browser
//!   sign-in flow and caches the token on disk for later sessions.
//!
//! ```no_run
//! use imfdata::{AuthMode, Connection, make_key};
//!
//! fn main() -> imfdata::Result<()> {
//!     let conn = Connection::from_env(AuthMode::NoAuth)?;
//!     let ifs = conn.get_dataset("IFS")?;
//!
//!     let areas = ifs.get_codelist_env("CL_AREA")?;
//!     let key = make_key([vec!["Q"], vec![areas.get("United_States")?], vec![]]);
//!     let table = ifs.get_data(&key, &[("startPeriod", "2020")], true)?;
//!     println!("{} observations", table.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod auth;
mod config;
mod connection;
mod dataset;
mod error;
mod names;
mod period;
pub mod sdmx;
mod service;
mod table;
mod util;

pub use auth::{
    Account, AuthMode, AuthToken, PublicClientApp, TokenAuth, TokenCache, TokenClient,
    TokenResponse, auth_headers,
};
pub use config::{AuthConfig, ConnectionConfig};
pub use connection::Connection;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use names::{KeepPolicy, LookupEnv, sanitize};
pub use period::{DATE, TIME_PERIOD, convert_time_period, parse_time_period};
pub use sdmx::{DataMessage, StructureMessage, resolve_codelist};
pub use service::{
    DataQuery, FlowRef, HttpService, References, SdmxService, StructureQuery, StructureType,
};
pub use table::{Table, Value};
pub use util::make_key;
