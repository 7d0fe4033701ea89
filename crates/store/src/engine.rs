//! Tablet engine: combines WAL + in-memory tablet.
//!
//! All mutations go through the WAL first (for durability), then into the
//! tablet. Validation happens before the WAL append so the log only ever
//! contains records that apply cleanly.

use crate::record::WalRecord;
use crate::tablet::{Table, Tablet};
use crate::wal::{FsyncPolicy, Wal};
use crate::StoreError;
use cellstore_common::{is_valid_name, Cell};
use std::collections::BTreeSet;
use std::path::Path;

/// The storage engine. All operations are synchronous (blocking I/O).
/// The async boundary is at the caller (the gRPC service layer).
#[derive(Debug)]
pub struct TabletEngine {
    tablet: Tablet,
    wal: Wal,
    last_timestamp_ms: u64,
}

impl TabletEngine {
    /// Open or create an engine at the given data directory.
    pub fn open(data_dir: &Path, fsync: FsyncPolicy) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let wal_path = data_dir.join("tablet.wal");

        // Replay WAL to rebuild catalog and rows
        let records = Wal::replay(&wal_path)?;
        let mut tablet = Tablet::new();
        let mut last_timestamp_ms = 0;
        for record in records {
            if let WalRecord::PutCell { timestamp_ms, .. } = &record {
                last_timestamp_ms = last_timestamp_ms.max(*timestamp_ms);
            }
            tablet.apply(record);
        }

        let wal = Wal::open(&wal_path, fsync)?;

        tracing::info!(
            "tablet engine opened: {} table(s) recovered from WAL at {:?}",
            tablet.table_count(),
            wal_path
        );

        Ok(Self {
            tablet,
            wal,
            last_timestamp_ms,
        })
    }

    /// Register a table with the given column families.
    ///
    /// A duplicate name is `TableExists`; an ill-formed definition is
    /// `InvalidSpec`. Idempotent "ensure" behavior is layered on by the
    /// client, which treats `TableExists` as success.
    pub fn create_table(
        &mut self,
        name: &str,
        families: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidSpec(format!(
                "invalid table name {:?}",
                name
            )));
        }
        if families.is_empty() {
            return Err(StoreError::InvalidSpec(format!(
                "table {:?} must declare at least one column family",
                name
            )));
        }
        for family in families {
            if !is_valid_name(family) {
                return Err(StoreError::InvalidSpec(format!(
                    "invalid column family name {:?}",
                    family
                )));
            }
        }
        if self.tablet.table(name).is_some() {
            return Err(StoreError::TableExists(name.to_string()));
        }

        self.wal.append(&WalRecord::CreateTable {
            table: name.to_string(),
            families: families.clone(),
        })?;
        self.tablet.create_table(name, families)
    }

    /// Write one cell, assigning the server-side timestamp. Returns the
    /// timestamp given to the cell.
    pub fn put_cell(
        &mut self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
        value: Vec<u8>,
    ) -> Result<u64, StoreError> {
        if row_key.is_empty() {
            return Err(StoreError::InvalidMutation("row key must not be empty".into()));
        }
        // Surface missing table/family before touching the WAL.
        let t = self
            .tablet
            .table(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if !t.families().contains(family) {
            return Err(StoreError::FamilyNotFound {
                table: table.to_string(),
                family: family.to_string(),
            });
        }

        let timestamp_ms = self.next_timestamp_ms();
        self.wal.append(&WalRecord::PutCell {
            table: table.to_string(),
            row_key: row_key.to_vec(),
            family: family.to_string(),
            qualifier: qualifier.to_vec(),
            value: value.clone(),
            timestamp_ms,
        })?;
        self.tablet
            .put_cell(table, row_key, family, qualifier, value, timestamp_ms)?;
        Ok(timestamp_ms)
    }

    /// Read one cell.
    pub fn get_cell(
        &self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, StoreError> {
        self.tablet.get_cell(table, row_key, family, qualifier)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tablet.table(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tablet.table_names()
    }

    pub fn table_count(&self) -> usize {
        self.tablet.table_count()
    }

    /// Sync the WAL to disk (for batch fsync mode).
    pub fn sync(&mut self) -> Result<(), StoreError> {
        self.wal.sync()?;
        Ok(())
    }

    /// Wall-clock timestamp, bumped to stay strictly increasing so that
    /// a rapid overwrite within one millisecond still versions correctly.
    fn next_timestamp_ms(&mut self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_timestamp_ms = now.max(self.last_timestamp_ms + 1);
        self.last_timestamp_ms
    }
}
