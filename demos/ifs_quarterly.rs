use anyhow::Result;
use imfdata::{AuthMode, Connection, make_key};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Public data needs no sign-in; call `conn.authenticate()` for restricted flows.
    let conn = Connection::from_env(AuthMode::NoAuth)?;
    let ifs = conn.get_dataset("IFS")?;
    println!("{} ({} {})", ifs.name(), ifs.agency_id(), ifs.version());

    for row in ifs.dimension_names()?.rows() {
        println!("  {} -> {}", row[0], row[1]);
    }

    let areas = ifs.get_codelist_env("CL_AREA")?;
    let key = make_key([
        vec!["Q"],
        vec![areas.get("United_States")?, areas.get("United_Kingdom")?],
        vec![],
    ]);
    let table = ifs.get_data(&key, &[("startPeriod", "2020")], true)?;

    println!("{}", table.columns().join("\t"));
    for row in table.rows().iter().take(10) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
