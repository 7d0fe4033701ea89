//! cellstore-provision: the table-provisioning and single-row-write workflow.
//!
//! [`TableProvisioner`] is the client-side core: ensure a table exists with
//! its column families, then write one cell. It is generic over [`TableRpc`]
//! so the domain logic is independent of the gRPC transport (which lives in
//! `cellstore-net`); tests exercise it against a scripted mock.
//!
//! Each operation is a single synchronous request/response against the
//! store. No caching, batching, or retry is attempted here, and the
//! composed workflow short-circuits on the first failure.

use async_trait::async_trait;
use cellstore_common::{Cell, ClientError, RowMutation, TableSpec};

/// Result of a raw create-table call, as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The table was created by this call.
    Created,
    /// A table with this name was already present; schema untouched.
    AlreadyExists,
}

/// Transport seam: the three store interactions the provisioner needs.
///
/// Implementations translate these calls onto the wire and map every
/// transport or server failure into a [`ClientError`] kind.
#[async_trait]
pub trait TableRpc: Send + Sync {
    /// Submit a table definition. "Already exists" is an outcome here, not
    /// an error; the provisioner decides what it means.
    async fn create_table(&self, spec: &TableSpec) -> Result<CreateOutcome, ClientError>;

    /// Write one cell; returns the server-assigned timestamp.
    async fn mutate_row(&self, table: &str, mutation: &RowMutation) -> Result<u64, ClientError>;

    /// Read one cell back.
    async fn read_cell(
        &self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, ClientError>;
}

/// Client-side table provisioning over a shared session.
///
/// Borrows its transport (typically a `Session`); the session's lifecycle
/// stays with the caller, which releases it exactly once after the
/// provisioner is done.
#[derive(Debug)]
pub struct TableProvisioner<'a, T: TableRpc + ?Sized> {
    rpc: &'a T,
}

impl<'a, T: TableRpc + ?Sized> TableProvisioner<'a, T> {
    pub fn new(rpc: &'a T) -> Self {
        Self { rpc }
    }

    /// Ensure `spec.name` exists with the given column families.
    ///
    /// Create-or-no-op: a pre-existing table is success, and its schema is
    /// left untouched. The definition is validated locally before any RPC,
    /// so an empty name or family set fails with a schema error without
    /// touching the cluster.
    pub async fn ensure_table(&self, spec: &TableSpec) -> Result<(), ClientError> {
        spec.validate()?;
        match self.rpc.create_table(spec).await? {
            CreateOutcome::Created => {
                tracing::info!(table = %spec.name, "table created");
            }
            CreateOutcome::AlreadyExists => {
                tracing::debug!(table = %spec.name, "table already present, leaving schema as-is");
            }
        }
        Ok(())
    }

    /// Write a single cell to `table`. Returns the server-assigned
    /// timestamp of the written cell.
    ///
    /// The mutation's family must be declared on the table; the store
    /// rejects the write with a not-found error otherwise, and nothing is
    /// partially written.
    pub async fn write_row(
        &self,
        table: &str,
        mutation: &RowMutation,
    ) -> Result<u64, ClientError> {
        mutation.validate()?;
        let timestamp_ms = self.rpc.mutate_row(table, mutation).await?;
        tracing::debug!(
            table,
            row_key = ?String::from_utf8_lossy(&mutation.row_key),
            family = %mutation.family,
            timestamp_ms,
            "cell written"
        );
        Ok(timestamp_ms)
    }

    /// Read the cell at (row key, family:qualifier) from `table`.
    pub async fn read_cell(
        &self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, ClientError> {
        self.rpc.read_cell(table, row_key, family, qualifier).await
    }

    /// The composed workflow: ensure the table, then write the cell.
    ///
    /// Short-circuits: if `ensure_table` fails with anything (including a
    /// connectivity failure), the write step is never attempted.
    pub async fn provision_and_write(
        &self,
        spec: &TableSpec,
        mutation: &RowMutation,
    ) -> Result<u64, ClientError> {
        self.ensure_table(spec).await?;
        self.write_row(&spec.name, mutation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq, Eq, Clone)]
    enum Call {
        Create(String),
        Mutate(String),
        Read(String),
    }

    /// Scripted transport: pops pre-programmed results and logs calls.
    struct MockRpc {
        calls: Mutex<Vec<Call>>,
        create_results: Mutex<Vec<Result<CreateOutcome, ClientError>>>,
        mutate_results: Mutex<Vec<Result<u64, ClientError>>>,
        read_results: Mutex<Vec<Result<Option<Cell>, ClientError>>>,
    }

    impl MockRpc {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                create_results: Mutex::new(Vec::new()),
                mutate_results: Mutex::new(Vec::new()),
                read_results: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TableRpc for MockRpc {
        async fn create_table(&self, spec: &TableSpec) -> Result<CreateOutcome, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Create(spec.name.clone()));
            self.create_results.lock().unwrap().remove(0)
        }

        async fn mutate_row(
            &self,
            table: &str,
            _mutation: &RowMutation,
        ) -> Result<u64, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Mutate(table.to_string()));
            self.mutate_results.lock().unwrap().remove(0)
        }

        async fn read_cell(
            &self,
            table: &str,
            _row_key: &[u8],
            _family: &str,
            _qualifier: &[u8],
        ) -> Result<Option<Cell>, ClientError> {
            self.calls.lock().unwrap().push(Call::Read(table.to_string()));
            self.read_results.lock().unwrap().remove(0)
        }
    }

    fn spec() -> TableSpec {
        TableSpec::with_family("testTable", "cf1")
    }

    fn mutation() -> RowMutation {
        RowMutation::new(b"rk1".to_vec(), "cf1", b"q1".to_vec(), b"ssssss".to_vec())
    }

    #[tokio::test]
    async fn test_ensure_table_idempotent() {
        let rpc = MockRpc::new();
        rpc.create_results
            .lock()
            .unwrap()
            .extend([Ok(CreateOutcome::Created), Ok(CreateOutcome::AlreadyExists)]);

        let provisioner = TableProvisioner::new(&rpc);
        // First call creates, second finds it present; both succeed.
        provisioner.ensure_table(&spec()).await.unwrap();
        provisioner.ensure_table(&spec()).await.unwrap();

        assert_eq!(
            rpc.calls(),
            vec![
                Call::Create("testTable".to_string()),
                Call::Create("testTable".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_table_invalid_spec_no_rpc() {
        let rpc = MockRpc::new();
        let provisioner = TableProvisioner::new(&rpc);

        let empty = TableSpec::new("testTable", std::iter::empty());
        let err = provisioner.ensure_table(&empty).await.unwrap_err();
        assert_eq!(err.kind(), "schema");
        assert!(rpc.calls().is_empty(), "invalid spec must not reach the wire");
    }

    #[tokio::test]
    async fn test_ensure_table_propagates_schema_rejection() {
        let rpc = MockRpc::new();
        rpc.create_results
            .lock()
            .unwrap()
            .push(Err(ClientError::Schema("cluster said no".into())));

        let provisioner = TableProvisioner::new(&rpc);
        let err = provisioner.ensure_table(&spec()).await.unwrap_err();
        assert_eq!(err.kind(), "schema");
    }

    #[tokio::test]
    async fn test_write_row_returns_timestamp() {
        let rpc = MockRpc::new();
        rpc.mutate_results.lock().unwrap().push(Ok(1234));

        let provisioner = TableProvisioner::new(&rpc);
        let ts = provisioner
            .write_row("testTable", &mutation())
            .await
            .unwrap();
        assert_eq!(ts, 1234);
    }

    #[tokio::test]
    async fn test_write_row_missing_family_not_found() {
        let rpc = MockRpc::new();
        rpc.mutate_results
            .lock()
            .unwrap()
            .push(Err(ClientError::NotFound("family cf9 missing".into())));

        let provisioner = TableProvisioner::new(&rpc);
        let err = provisioner
            .write_row("testTable", &mutation())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_write_row_empty_key_no_rpc() {
        let rpc = MockRpc::new();
        let provisioner = TableProvisioner::new(&rpc);

        let bad = RowMutation::new(Vec::new(), "cf1", b"q1".to_vec(), b"v".to_vec());
        let err = provisioner.write_row("testTable", &bad).await.unwrap_err();
        assert_eq!(err.kind(), "write");
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_workflow_happy_path() {
        let rpc = MockRpc::new();
        rpc.create_results
            .lock()
            .unwrap()
            .push(Ok(CreateOutcome::Created));
        rpc.mutate_results.lock().unwrap().push(Ok(9));

        let provisioner = TableProvisioner::new(&rpc);
        let ts = provisioner
            .provision_and_write(&spec(), &mutation())
            .await
            .unwrap();
        assert_eq!(ts, 9);
        assert_eq!(
            rpc.calls(),
            vec![
                Call::Create("testTable".to_string()),
                Call::Mutate("testTable".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_workflow_preexisting_table_still_writes() {
        let rpc = MockRpc::new();
        rpc.create_results
            .lock()
            .unwrap()
            .push(Ok(CreateOutcome::AlreadyExists));
        rpc.mutate_results.lock().unwrap().push(Ok(5));

        let provisioner = TableProvisioner::new(&rpc);
        let ts = provisioner
            .provision_and_write(&spec(), &mutation())
            .await
            .unwrap();
        assert_eq!(ts, 5);
    }

    #[tokio::test]
    async fn test_workflow_halts_on_connectivity_failure() {
        let rpc = MockRpc::new();
        rpc.create_results
            .lock()
            .unwrap()
            .push(Err(ClientError::Connectivity("cluster unreachable".into())));

        let provisioner = TableProvisioner::new(&rpc);
        let err = provisioner
            .provision_and_write(&spec(), &mutation())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connectivity");
        assert_eq!(
            rpc.calls(),
            vec![Call::Create("testTable".to_string())],
            "write step must not run after a failed ensure"
        );
    }

    #[tokio::test]
    async fn test_read_cell_passthrough() {
        let rpc = MockRpc::new();
        rpc.read_results.lock().unwrap().push(Ok(Some(Cell {
            value: b"ssssss".to_vec(),
            timestamp_ms: 77,
        })));

        let provisioner = TableProvisioner::new(&rpc);
        let cell = provisioner
            .read_cell("testTable", b"rk1", "cf1", b"q1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cell.value, b"ssssss");
    }
}
