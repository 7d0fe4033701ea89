//! In-memory tablet state: the schema catalog plus row data.
//!
//! Cells are addressed by (row key, family, qualifier) and hold a single
//! version; a later write to the same coordinates replaces the earlier one
//! (last-writer-wins, matching server-assigned timestamps arriving in
//! write order).

use crate::record::WalRecord;
use crate::StoreError;
use cellstore_common::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// (family, qualifier) coordinates of a cell within a row.
type CellCoord = (String, Vec<u8>);

/// One table: declared families plus its rows.
#[derive(Debug, Default)]
pub struct Table {
    families: BTreeSet<String>,
    rows: BTreeMap<Vec<u8>, HashMap<CellCoord, Cell>>,
}

impl Table {
    fn new(families: BTreeSet<String>) -> Self {
        Self {
            families,
            rows: BTreeMap::new(),
        }
    }

    pub fn families(&self) -> &BTreeSet<String> {
        &self.families
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(HashMap::len).sum()
    }
}

/// All tables held by this node.
#[derive(Debug, Default)]
pub struct Tablet {
    tables: HashMap<String, Table>,
}

impl Tablet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Fails if a table with the same name exists;
    /// the create-or-no-op decision belongs to the client, not the store.
    pub fn create_table(
        &mut self,
        name: &str,
        families: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        if self.tables.contains_key(name) {
            return Err(StoreError::TableExists(name.to_string()));
        }
        self.tables
            .insert(name.to_string(), Table::new(families.clone()));
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Write one cell. The family must be declared on the table.
    pub fn put_cell(
        &mut self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
        value: Vec<u8>,
        timestamp_ms: u64,
    ) -> Result<(), StoreError> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if !t.families.contains(family) {
            return Err(StoreError::FamilyNotFound {
                table: table.to_string(),
                family: family.to_string(),
            });
        }

        let row = t.rows.entry(row_key.to_vec()).or_default();
        row.insert(
            (family.to_string(), qualifier.to_vec()),
            Cell {
                value,
                timestamp_ms,
            },
        );
        Ok(())
    }

    /// Read one cell. `Ok(None)` means the table and family exist but the
    /// cell does not; a missing table or family is an error.
    pub fn get_cell(
        &self,
        table: &str,
        row_key: &[u8],
        family: &str,
        qualifier: &[u8],
    ) -> Result<Option<Cell>, StoreError> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if !t.families.contains(family) {
            return Err(StoreError::FamilyNotFound {
                table: table.to_string(),
                family: family.to_string(),
            });
        }

        Ok(t.rows
            .get(row_key)
            .and_then(|row| row.get(&(family.to_string(), qualifier.to_vec())))
            .cloned())
    }

    /// Apply a record during WAL replay. Replay trusts the log: a record
    /// that no longer applies (e.g. duplicate create from a partially
    /// synced log) is skipped with a warning rather than aborting recovery.
    pub fn apply(&mut self, record: WalRecord) {
        let result = match record {
            WalRecord::CreateTable { table, families } => self.create_table(&table, &families),
            WalRecord::PutCell {
                table,
                row_key,
                family,
                qualifier,
                value,
                timestamp_ms,
            } => self.put_cell(&table, &row_key, &family, &qualifier, value, timestamp_ms),
        };
        if let Err(e) = result {
            tracing::warn!("skipping stale WAL record during replay: {}", e);
        }
    }
}
