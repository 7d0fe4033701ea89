//! cellstore: ensure a table exists, write one cell, read it back.
//!
//! The canonical demo workflow: connect a session, ensure `testTable`
//! exists with family `cf1`, write `(rk1, cf1:q1) = "ssssss"`, verify the
//! read-back, release the session. Any failure prints the error kind and
//! message and exits non-zero; the write step never runs if provisioning
//! failed.

use cellstore_common::{ClientError, RowMutation, TableSpec};
use cellstore_config::ClientConfig;
use cellstore_net::Session;
use cellstore_provision::TableProvisioner;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cellstore", about = "Provision a table and write one cell")]
struct Args {
    /// Client config YAML (cluster addresses). Overrides --endpoint.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cluster address to connect to when no config file is given.
    #[arg(long, default_value = "127.0.0.1:7700")]
    endpoint: String,

    /// Table to ensure and write into.
    #[arg(long, default_value = "testTable")]
    table: String,

    /// Row key of the written cell.
    #[arg(long, default_value = "rk1")]
    row_key: String,

    /// Column family to declare on the table and write into.
    #[arg(long, default_value = "cf1")]
    family: String,

    /// Column qualifier of the written cell.
    #[arg(long, default_value = "q1")]
    qualifier: String,

    /// Value to store.
    #[arg(long, default_value = "ssssss")]
    value: String,
}

#[tokio::main]
async fn main() {
    cellstore_metrics::init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("error ({}): {}", e.kind(), e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let config = match &args.config {
        Some(path) => cellstore_config::load_client_config(path)
            .map_err(|e| ClientError::Connectivity(format!("bad endpoint config: {}", e)))?,
        None => ClientConfig::single(args.endpoint.clone()),
    };

    let spec = TableSpec::with_family(args.table.clone(), args.family.clone());
    let mutation = RowMutation::new(
        args.row_key.clone().into_bytes(),
        args.family.clone(),
        args.qualifier.clone().into_bytes(),
        args.value.clone().into_bytes(),
    );

    // One session for the whole workflow, released on every exit path
    // (`?` drops it; the explicit close below is the success path).
    let session = Session::connect(&config).await?;

    let provisioner = TableProvisioner::new(&session);
    let result = run_workflow(&provisioner, &args, &spec, &mutation).await;
    session.close();
    result
}

async fn run_workflow(
    provisioner: &TableProvisioner<'_, Session>,
    args: &Args,
    spec: &TableSpec,
    mutation: &RowMutation,
) -> Result<(), ClientError> {
    let timestamp_ms = provisioner.provision_and_write(spec, mutation).await?;

    // Read the cell back so the confirmation reflects server state.
    let cell = provisioner
        .read_cell(
            &args.table,
            &mutation.row_key,
            &mutation.family,
            &mutation.qualifier,
        )
        .await?
        .ok_or_else(|| {
            ClientError::Write("written cell missing on read-back".to_string())
        })?;

    println!(
        "wrote {}/{} {}:{} = {:?} (timestamp {} ms)",
        args.table,
        args.row_key,
        args.family,
        args.qualifier,
        String::from_utf8_lossy(&cell.value),
        timestamp_ms,
    );
    Ok(())
}
