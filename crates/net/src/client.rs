//! gRPC client: the cluster `Session` and the handles derived from it.
//!
//! `Session` wraps one tonic channel and is the process-wide connection to
//! the cluster: create it once, share it freely (it is cheap to hand out
//! handles from any thread), and release it exactly once with
//! [`Session::close`] when the process is done.
//!
//! `AdminHandle` and `TableHandle` are lightweight and single-purpose;
//! obtain a fresh one per unit of work instead of caching them.

use crate::convert;
use async_trait::async_trait;
use cellstore_common::{Cell, ClientError, RowMutation, TableSpec};
use cellstore_config::ClientConfig;
use cellstore_proto::admin::admin_service_client::AdminServiceClient;
use cellstore_proto::table::table_service_client::TableServiceClient;
use cellstore_provision::{CreateOutcome, TableRpc};
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Code;

// ---------------------------------------------------------------------------
// Status -> ClientError mapping
// ---------------------------------------------------------------------------

/// Map a failed admin RPC onto a client error kind. Schema rejections come
/// back as INVALID_ARGUMENT; anything transport-shaped is connectivity.
fn admin_status_to_error(op: &str, status: tonic::Status) -> ClientError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown => {
            ClientError::Connectivity(format!("{} failed: {}", op, status.message()))
        }
        Code::InvalidArgument | Code::FailedPrecondition | Code::AlreadyExists => {
            ClientError::Schema(status.message().to_string())
        }
        Code::NotFound => ClientError::NotFound(status.message().to_string()),
        _ => ClientError::Schema(format!("{} failed: {}", op, status.message())),
    }
}

/// Map a failed data-path RPC onto a client error kind. Missing table or
/// family is NOT_FOUND; a malformed mutation is a write rejection.
fn table_status_to_error(op: &str, status: tonic::Status) -> ClientError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown => {
            ClientError::Connectivity(format!("{} failed: {}", op, status.message()))
        }
        Code::NotFound => ClientError::NotFound(status.message().to_string()),
        _ => ClientError::Write(format!("{} failed: {}", op, status.message())),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A live connection to the cluster.
///
/// Thread-safe: concurrent callers may issue independent admin and table
/// calls through clones of the underlying channel. The session itself does
/// not serialize them; ordering between concurrent writes to the same cell
/// is decided by the store's timestamps.
#[derive(Debug)]
pub struct Session {
    channel: Channel,
    addr: String,
    cluster_id: Option<String>,
}

impl Session {
    /// Establish the connection described by `config`.
    ///
    /// Addresses are tried in order; the first that accepts a connection
    /// within the configured timeout wins. If none do, the error is
    /// [`ClientError::Connectivity`] carrying the last failure.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::Connectivity(format!("invalid endpoint config: {}", e)))?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut last_err = None;

        for addr in &config.cluster {
            let uri = format!("http://{}", addr);
            let endpoint = match Channel::from_shared(uri) {
                Ok(ep) => ep.connect_timeout(timeout),
                Err(e) => {
                    last_err = Some(format!("invalid address {:?}: {}", addr, e));
                    continue;
                }
            };

            match endpoint.connect().await {
                Ok(channel) => {
                    tracing::info!(addr = %addr, "session established");
                    return Ok(Self {
                        channel,
                        addr: addr.clone(),
                        cluster_id: config.cluster_id.clone(),
                    });
                }
                Err(e) => {
                    tracing::debug!(addr = %addr, "connect failed: {}", e);
                    last_err = Some(format!("connect to {} failed: {}", addr, e));
                }
            }
        }

        Err(ClientError::Connectivity(last_err.unwrap_or_else(|| {
            "no cluster addresses configured".to_string()
        })))
    }

    /// Address of the server this session is connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Cluster identifier from the endpoint config, if any.
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }

    /// Obtain an admin handle for schema operations.
    pub fn admin(&self) -> AdminHandle {
        AdminHandle {
            client: AdminServiceClient::new(self.channel.clone()),
        }
    }

    /// Obtain a handle on one table for data operations.
    pub fn table(&self, name: impl Into<String>) -> TableHandle {
        TableHandle {
            name: name.into(),
            client: TableServiceClient::new(self.channel.clone()),
        }
    }

    /// Release the session. Call exactly once, on every exit path, after
    /// all handles derived from it are done.
    pub fn close(self) {
        tracing::debug!(addr = %self.addr, "session closed");
        drop(self.channel);
    }
}

// The provisioner talks to the cluster through the session directly.
#[async_trait]
impl TableRpc for Session {
    async fn create_table(&self, spec: &TableSpec) -> Result<CreateOutcome, ClientError> {
        self.admin().create_table(spec).await
    }

    async fn mutate_row(&self, table: &str, mutation: &RowMutation) -> Result<u64, ClientError> {
        self.table(table).put(mutation).await
    }

    async fn read_cell(
        &self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, ClientError> {
        self.table(table).get_cell(row_key, family, qualifier).await
    }
}

// ---------------------------------------------------------------------------
// AdminHandle
// ---------------------------------------------------------------------------

/// Health report from the server.
#[derive(Debug, Clone)]
pub struct HealthInfo {
    pub healthy: bool,
    pub node_name: String,
    pub uptime_secs: u64,
    pub table_count: u64,
}

/// Schema operations against the cluster.
#[derive(Debug)]
pub struct AdminHandle {
    client: AdminServiceClient<Channel>,
}

impl AdminHandle {
    /// Submit a table definition. A duplicate name is reported as
    /// [`CreateOutcome::AlreadyExists`], not an error; the caller decides
    /// whether that is acceptable.
    pub async fn create_table(mut self, spec: &TableSpec) -> Result<CreateOutcome, ClientError> {
        let result = self
            .client
            .create_table(cellstore_proto::admin::CreateTableRequest {
                name: spec.name.clone(),
                families: spec.families.iter().cloned().collect(),
            })
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(status) if status.code() == Code::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
            Err(status) => Err(admin_status_to_error("create_table", status)),
        }
    }

    /// List all tables with their column families.
    pub async fn list_tables(mut self) -> Result<Vec<TableSpec>, ClientError> {
        let resp = self
            .client
            .list_tables(cellstore_proto::admin::ListTablesRequest {})
            .await
            .map_err(|status| admin_status_to_error("list_tables", status))?;

        Ok(resp
            .into_inner()
            .tables
            .into_iter()
            .map(convert::table_spec_from_proto)
            .collect())
    }

    /// Query server health.
    pub async fn health(mut self) -> Result<HealthInfo, ClientError> {
        let resp = self
            .client
            .health(cellstore_proto::admin::HealthRequest {})
            .await
            .map_err(|status| admin_status_to_error("health", status))?;

        let inner = resp.into_inner();
        Ok(HealthInfo {
            healthy: inner.healthy,
            node_name: inner.node_name,
            uptime_secs: inner.uptime_secs,
            table_count: inner.table_count,
        })
    }
}

// ---------------------------------------------------------------------------
// TableHandle
// ---------------------------------------------------------------------------

/// Data operations against one table.
#[derive(Debug)]
pub struct TableHandle {
    name: String,
    client: TableServiceClient<Channel>,
}

impl TableHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write one cell; returns the server-assigned timestamp.
    pub async fn put(mut self, mutation: &RowMutation) -> Result<u64, ClientError> {
        let resp = self
            .client
            .mutate_row(cellstore_proto::table::MutateRowRequest {
                table: self.name.clone(),
                row_key: mutation.row_key.clone(),
                family: mutation.family.clone(),
                qualifier: mutation.qualifier.clone(),
                value: mutation.value.clone(),
            })
            .await
            .map_err(|status| table_status_to_error("mutate_row", status))?;

        Ok(resp.into_inner().timestamp_ms)
    }

    /// Read one cell; `Ok(None)` when the cell does not exist.
    pub async fn get_cell(
        mut self,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, ClientError> {
        let resp = self
            .client
            .read_cell(cellstore_proto::table::ReadCellRequest {
                table: self.name.clone(),
                row_key: row_key.to_vec(),
                family: family.to_string(),
                qualifier: qualifier.to_vec(),
            })
            .await
            .map_err(|status| table_status_to_error("read_cell", status))?;

        Ok(resp.into_inner().cell.map(convert::cell_from_proto))
    }
}
