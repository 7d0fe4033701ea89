//! gRPC service implementations.
//!
//! Bridges the tonic-generated service traits to the `TabletEngine`. Each
//! RPC is a single lock acquisition around a synchronous engine call; the
//! engine itself does the blocking WAL I/O.

use crate::convert;
use cellstore_store::TabletEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Admin gRPC service
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AdminService {
    pub engine: Arc<RwLock<TabletEngine>>,
    pub node_name: String,
    pub start_time: Instant,
}

#[tonic::async_trait]
impl cellstore_proto::admin::admin_service_server::AdminService for AdminService {
    async fn create_table(
        &self,
        request: tonic::Request<cellstore_proto::admin::CreateTableRequest>,
    ) -> Result<tonic::Response<cellstore_proto::admin::CreateTableResponse>, tonic::Status> {
        let m = cellstore_metrics::metrics();
        m.observe_rpc("create_table");
        let _timer = cellstore_metrics::start_rpc_timer("create_table");
        let req = request.into_inner();

        let families = req.families.into_iter().collect();
        let mut engine = self.engine.write().await;
        engine
            .create_table(&req.name, &families)
            .map_err(convert::store_error_to_status)?;

        m.tables_created.inc();
        tracing::info!(table = %req.name, "created table");

        Ok(tonic::Response::new(
            cellstore_proto::admin::CreateTableResponse { created: true },
        ))
    }

    async fn list_tables(
        &self,
        _request: tonic::Request<cellstore_proto::admin::ListTablesRequest>,
    ) -> Result<tonic::Response<cellstore_proto::admin::ListTablesResponse>, tonic::Status> {
        let m = cellstore_metrics::metrics();
        m.observe_rpc("list_tables");
        let _timer = cellstore_metrics::start_rpc_timer("list_tables");

        let engine = self.engine.read().await;
        let tables = engine
            .table_names()
            .into_iter()
            .map(|name| {
                let families = engine
                    .table(&name)
                    .map(|t| t.families().iter().cloned().collect())
                    .unwrap_or_default();
                cellstore_proto::common::TableDescriptor { name, families }
            })
            .collect();

        Ok(tonic::Response::new(
            cellstore_proto::admin::ListTablesResponse { tables },
        ))
    }

    async fn health(
        &self,
        _request: tonic::Request<cellstore_proto::admin::HealthRequest>,
    ) -> Result<tonic::Response<cellstore_proto::admin::HealthResponse>, tonic::Status> {
        cellstore_metrics::metrics().observe_rpc("health");

        let engine = self.engine.read().await;
        Ok(tonic::Response::new(
            cellstore_proto::admin::HealthResponse {
                healthy: true,
                node_name: self.node_name.clone(),
                uptime_secs: self.start_time.elapsed().as_secs(),
                table_count: engine.table_count() as u64,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Table gRPC service
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct TableService {
    pub engine: Arc<RwLock<TabletEngine>>,
}

#[tonic::async_trait]
impl cellstore_proto::table::table_service_server::TableService for TableService {
    async fn mutate_row(
        &self,
        request: tonic::Request<cellstore_proto::table::MutateRowRequest>,
    ) -> Result<tonic::Response<cellstore_proto::table::MutateRowResponse>, tonic::Status> {
        let m = cellstore_metrics::metrics();
        m.observe_rpc("mutate_row");
        let _timer = cellstore_metrics::start_rpc_timer("mutate_row");
        let req = request.into_inner();

        let mut engine = self.engine.write().await;
        let timestamp_ms = engine
            .put_cell(&req.table, &req.row_key, &req.family, &req.qualifier, req.value)
            .map_err(convert::store_error_to_status)?;

        m.row_puts.inc();

        Ok(tonic::Response::new(
            cellstore_proto::table::MutateRowResponse { timestamp_ms },
        ))
    }

    async fn read_cell(
        &self,
        request: tonic::Request<cellstore_proto::table::ReadCellRequest>,
    ) -> Result<tonic::Response<cellstore_proto::table::ReadCellResponse>, tonic::Status> {
        let m = cellstore_metrics::metrics();
        m.observe_rpc("read_cell");
        let _timer = cellstore_metrics::start_rpc_timer("read_cell");
        let req = request.into_inner();

        let engine = self.engine.read().await;
        let cell = engine
            .get_cell(&req.table, &req.row_key, &req.family, &req.qualifier)
            .map_err(convert::store_error_to_status)?;

        m.cell_reads.inc();

        Ok(tonic::Response::new(
            cellstore_proto::table::ReadCellResponse {
                cell: cell.as_ref().map(convert::cell_to_proto),
            },
        ))
    }
}
