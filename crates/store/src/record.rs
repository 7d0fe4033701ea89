//! WAL record format.
//!
//! Each record is one logical mutation of tablet state: a schema change or
//! a single cell write. Replaying the records in order reproduces the full
//! tablet state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalRecord {
    /// A table was registered in the catalog.
    CreateTable {
        table: String,
        families: BTreeSet<String>,
    },

    /// A cell was written. `timestamp_ms` is the server-assigned version,
    /// recorded so replay reproduces the exact cell the client saw.
    PutCell {
        table: String,
        row_key: Vec<u8>,
        family: String,
        qualifier: Vec<u8>,
        value: Vec<u8>,
        timestamp_ms: u64,
    },
}

impl WalRecord {
    /// The table this record touches.
    pub fn table(&self) -> &str {
        match self {
            WalRecord::CreateTable { table, .. } => table,
            WalRecord::PutCell { table, .. } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_roundtrip() {
        let create = WalRecord::CreateTable {
            table: "testTable".to_string(),
            families: ["cf1".to_string()].into_iter().collect(),
        };
        let put = WalRecord::PutCell {
            table: "testTable".to_string(),
            row_key: b"rk1".to_vec(),
            family: "cf1".to_string(),
            qualifier: b"q1".to_vec(),
            value: b"ssssss".to_vec(),
            timestamp_ms: 42,
        };

        for record in [create, put] {
            let json = serde_json::to_vec(&record).unwrap();
            let back: WalRecord = serde_json::from_slice(&json).unwrap();
            assert_eq!(record, back);
            assert_eq!(record.table(), "testTable");
        }
    }

    #[test]
    fn test_record_tagged_encoding() {
        let record = WalRecord::CreateTable {
            table: "t".to_string(),
            families: BTreeSet::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"op\":\"create_table\""), "{}", json);
    }
}
