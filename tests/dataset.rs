mod common;

use std::sync::Arc;

use common::*;
use imfdata::{AuthMode, DATE, Error, Table, Value};
use pretty_assertions::assert_eq;

fn rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows()
        .iter()
        .map(|r| r.iter().map(ToString::to_string).collect())
        .collect()
}

#[test]
fn ifs_dimension_names_in_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let conn = connect(&svc, Arc::default(), &dir, AuthMode::NoAuth).unwrap();

    let ifs = conn.get_dataset("IFS").unwrap();
    assert_eq!(ifs.id(), "IFS");
    assert_eq!(ifs.agency_id(), "IMF.STA");
    assert_eq!(ifs.version(), "8.0.0");
    assert_eq!(ifs.name(), "International Financial Statistics");

    let dims = ifs.dimension_names().unwrap();
    assert_eq!(dims.columns(), ["dimension_id", "codelist_id"]);
    assert_eq!(
        rows(dims),
        vec![vec!["FREQ", "CL_FREQ"], vec!["REF_AREA", "CL_AREA"]]
    );
    assert_eq!(svc.paths(), vec![IFS_DATAFLOW_PATH.to_string()]);
}

#[test]
fn more_or_fewer_than_one_dataflow_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connect(&service(), Arc::default(), &dir, AuthMode::NoAuth).unwrap();

    match conn.get_dataset("PAIR").unwrap_err() {
        Error::Ambiguous { kind, found } => {
            assert_eq!(kind, "dataflow");
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        conn.get_dataset("NONE").unwrap_err(),
        Error::Ambiguous { found: 0, .. }
    ));
}

#[test]
fn concept_level_codelist_only() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connect(&service(), Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let bop = conn.get_dataset("BOP").unwrap();
    assert_eq!(bop.name(), "Balance of Payments");

    // INDICATOR only has a local enumeration, which this listing ignores.
    // COUNTERPART's codelist is reported although the message lacks it.
    let dims = bop.dimension_names().unwrap();
    assert!(dims.get(0, "codelist_id").unwrap().is_null());
    assert_eq!(
        dims.get(1, "codelist_id"),
        Some(&Value::from("CL_COUNTERPART"))
    );

    let env = bop.get_dimension_names_env().unwrap();
    assert_eq!(env.keys(), vec!["COUNTERPART"]);
    assert_eq!(env.get("COUNTERPART").unwrap(), "CL_COUNTERPART");
    assert!(bop.dimension_env().unwrap().get("INDICATOR").unwrap_err().is_not_found());
}

#[test]
fn codelists_summary_uses_bound_message() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let conn = connect(&svc, Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let ifs = conn.get_dataset("IFS").unwrap();

    let summary = ifs.codelists_summary().unwrap();
    assert_eq!(summary.columns(), ["codelist_id", "name", "version", "n_codes"]);
    assert_eq!(
        rows(summary),
        vec![
            vec!["CL_FREQ", "Frequency", "1.0.0", "3"],
            vec!["CL_AREA", "Areas", "2.1.0", "3"],
        ]
    );
    assert_eq!(svc.paths().len(), 1);
}

#[test]
fn codelists_summary_fetches_descendants_once() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let conn = connect(&svc, Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let bop = conn.get_dataset("BOP").unwrap();

    let summary = bop.codelists_summary().unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary.get(0, "n_codes"), Some(&Value::Num(2.0)));

    let codes = bop.get_codelist("CL_COUNTERPART").unwrap();
    assert_eq!(rows(&codes), vec![vec!["W1", "World", ""]]);
    assert_eq!(
        svc.paths(),
        vec![BOP_DATAFLOW_PATH.to_string(), BOP_DSD_PATH.to_string()]
    );
}

#[test]
fn codelist_rows_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connect(&service(), Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let ifs = conn.get_dataset("IFS").unwrap();

    let (table, env) = ifs.codelist("CL_AREA").unwrap();
    assert_eq!(table.columns(), ["code_id", "name", "description"]);
    assert_eq!(
        table.get(0, "description"),
        Some(&Value::from("United States of America"))
    );
    assert_eq!(table.get(1, "description"), Some(&Value::from("")));

    // Duplicate labels keep the first code.
    assert_eq!(env.get("United_States").unwrap(), "US");
    assert_eq!(env.get("United_Kingdom").unwrap(), "GB");
    assert_eq!(env.len(), 2);

    let freq = ifs.get_codelist_env("CL_FREQ").unwrap();
    assert_eq!(freq.keys(), vec!["Annual", "Monthly", "Quarterly"]);
}

#[test]
fn unknown_codelist_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connect(&service(), Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let ifs = conn.get_dataset("IFS").unwrap();

    let err = ifs.get_codelist("CL_NOPE").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "codelist not found: CL_NOPE");
    assert!(ifs.codelist("CL_NOPE").is_err());
}

#[test]
fn get_data_uses_flow_agency_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let conn = connect(&svc, Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let ifs = conn.get_dataset("IFS").unwrap();

    let areas = ifs.get_codelist_env("CL_AREA").unwrap();
    let key = imfdata::make_key([
        vec!["Q"],
        vec![
            areas.get("United_States").unwrap(),
            areas.get("United_Kingdom").unwrap(),
        ],
    ]);
    assert_eq!(key, "Q.US+GB");

    let table = ifs.get_data(&key, &[("startPeriod", "2020")], true).unwrap();
    assert_eq!(svc.paths().last().unwrap(), IFS_DATA_PATH);
    assert_eq!(
        svc.last_params(),
        vec![("startPeriod".to_string(), "2020".to_string())]
    );
    assert_eq!(
        table.columns(),
        ["FREQ", "REF_AREA", "TIME_PERIOD", "OBS_VALUE", DATE]
    );
    assert_eq!(
        rows(&table),
        vec![
            vec!["Q", "US", "2020-Q1", "101.5", "2020-03-31"],
            vec!["Q", "US", "2020-Q2", "102.25", "2020-06-30"],
            vec!["Q", "GB", "2020-Q2", "", "2020-06-30"],
        ]
    );
}

#[test]
fn get_data_omits_missing_agency_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let conn = connect(&svc, Arc::default(), &dir, AuthMode::NoAuth).unwrap();
    let bare = conn.get_dataset("X").unwrap();
    assert_eq!(bare.agency_id(), "");

    let table = bare.get_data("A", &[], true).unwrap();
    assert!(table.is_empty());
    assert_eq!(svc.paths().last().unwrap(), BARE_DATA_PATH);
    assert!(svc.last_params().is_empty());
}
