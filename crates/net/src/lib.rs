//! gRPC networking layer for cellstore.
//!
//! Provides:
//! - `Session`: the shared client-side handle to a cluster connection,
//!   implementing `TableRpc` for the provisioner
//! - `AdminHandle` / `TableHandle`: lightweight per-call handles obtained
//!   from a `Session`
//! - `AdminService`: bridges the admin proto to the `TabletEngine` catalog
//! - `TableService`: bridges the table proto to cell reads and writes
//! - `build_server`: assembles both services into a tonic `Router`

#![allow(clippy::result_large_err)]

pub mod client;
pub mod convert;
pub mod server;

pub use client::{AdminHandle, HealthInfo, Session, TableHandle};
pub use server::{AdminService, TableService};

use cellstore_store::TabletEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Build a tonic `Router` with both gRPC services over one engine.
pub fn build_server(
    engine: Arc<RwLock<TabletEngine>>,
    node_name: String,
) -> tonic::transport::server::Router {
    let admin_svc = AdminService {
        engine: engine.clone(),
        node_name,
        start_time: Instant::now(),
    };
    let table_svc = TableService { engine };

    tonic::transport::Server::builder()
        .add_service(
            cellstore_proto::admin::admin_service_server::AdminServiceServer::new(admin_svc),
        )
        .add_service(
            cellstore_proto::table::table_service_server::TableServiceServer::new(table_svc),
        )
}
