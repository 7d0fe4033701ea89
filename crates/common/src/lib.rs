//! cellstore-common: shared types for the cellstore project.
//!
//! Provides the `TableSpec` / `RowMutation` / `Cell` domain types used on
//! both sides of the wire, plus `ClientError`, the error taxonomy every
//! client-facing operation reports through.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

/// Maximum length accepted for table and column-family names.
pub const MAX_NAME_LEN: usize = 255;

/// Returns `true` if `name` is acceptable as a table or family name:
/// non-empty, at most [`MAX_NAME_LEN`] bytes, printable ASCII, and free of
/// `:` (reserved as the family/qualifier separator in display form) and `/`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b':' && b != b'/')
}

// ---------------------------------------------------------------------------
// TableSpec
// ---------------------------------------------------------------------------

/// Schema of one table: a name plus its set of column families.
///
/// Immutable once submitted for creation. The family set is ordered so a
/// spec always serializes and displays the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub families: BTreeSet<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, families: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            families: families.into_iter().collect(),
        }
    }

    /// Single-family convenience constructor.
    pub fn with_family(name: impl Into<String>, family: impl Into<String>) -> Self {
        let mut families = BTreeSet::new();
        families.insert(family.into());
        Self {
            name: name.into(),
            families,
        }
    }

    /// Check the spec before it goes anywhere near the cluster.
    ///
    /// Violations are reported as [`ClientError::Schema`] so callers see the
    /// same error kind whether the definition is rejected locally or by the
    /// server.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !is_valid_name(&self.name) {
            return Err(ClientError::Schema(format!(
                "invalid table name {:?}",
                self.name
            )));
        }
        if self.families.is_empty() {
            return Err(ClientError::Schema(format!(
                "table {:?} must declare at least one column family",
                self.name
            )));
        }
        for family in &self.families {
            if !is_valid_name(family) {
                return Err(ClientError::Schema(format!(
                    "invalid column family name {:?} on table {:?}",
                    family, self.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.name)?;
        for (i, family) in self.families.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", family)?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// RowMutation
// ---------------------------------------------------------------------------

/// One cell write: (row key, family:qualifier) = value.
///
/// Built fresh per request; never reused after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMutation {
    pub row_key: Vec<u8>,
    pub family: String,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
}

impl RowMutation {
    pub fn new(
        row_key: impl Into<Vec<u8>>,
        family: impl Into<String>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }

    /// Local well-formedness check. Family membership on the target table
    /// can only be judged by the server; this catches what the client can.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.row_key.is_empty() {
            return Err(ClientError::Write("row key must not be empty".into()));
        }
        if self.family.is_empty() {
            return Err(ClientError::Write("column family must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A stored cell value plus the timestamp the server assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a client-facing operation can fail with.
///
/// Every failure coming out of the transport or the server is wrapped into
/// exactly one of these kinds; no operation swallows an error and continues.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The cluster (or its coordination service) cannot be reached.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// A table or family definition is invalid or conflicts with existing schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// The target table or column family does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A cell write was rejected for any other reason.
    #[error("write rejected: {0}")]
    Write(String),
}

impl ClientError {
    /// Short machine-friendly name of the error kind, used in process-level
    /// diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Connectivity(_) => "connectivity",
            ClientError::Schema(_) => "schema",
            ClientError::NotFound(_) => "not_found",
            ClientError::Write(_) => "write",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
